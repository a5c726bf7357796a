use std::io;
use std::mem;
use std::net::Ipv4Addr;
#[cfg(target_os = "macos")]
use std::net::Ipv6Addr;
use std::ptr;

/// Encode `addr` as a `sockaddr_in` suitable for an `ifreq` union slot.
pub(crate) fn sockaddr_in(addr: Ipv4Addr) -> libc::sockaddr_in {
    let mut sa: libc::sockaddr_in = unsafe { mem::zeroed() };
    cfg_if::cfg_if! {
        if #[cfg(target_os = "macos")] {
            sa.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
        }
    }
    sa.sin_family = libc::AF_INET as libc::sa_family_t;
    sa.sin_addr = libc::in_addr {
        s_addr: u32::from_ne_bytes(addr.octets()),
    };
    sa
}

#[cfg(target_os = "macos")]
pub(crate) fn sockaddr_in6(addr: Ipv6Addr) -> libc::sockaddr_in6 {
    let mut sa: libc::sockaddr_in6 = unsafe { mem::zeroed() };
    sa.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
    sa.sin6_family = libc::AF_INET6 as libc::sa_family_t;
    sa.sin6_addr = libc::in6_addr {
        s6_addr: addr.octets(),
    };
    sa
}

/// Write an IPv4 address into a `sockaddr`-typed request field.
///
/// # Safety
/// `slot` must point to storage at least `sockaddr_in`-sized, such as an
/// `ifreq` address union member.
pub(crate) unsafe fn write_ipv4(slot: *mut libc::sockaddr, addr: Ipv4Addr) {
    ptr::write(slot as *mut libc::sockaddr_in, sockaddr_in(addr));
}

/// Decode an IPv4 address from a `sockaddr`-typed request field.
///
/// `AF_UNSPEC` is tolerated: BSD kernels return it on some netmask queries.
///
/// # Safety
/// `slot` must point to storage at least `sockaddr_in`-sized.
pub(crate) unsafe fn read_ipv4(slot: *const libc::sockaddr) -> io::Result<Ipv4Addr> {
    let sa = ptr::read(slot as *const libc::sockaddr_in);
    if sa.sin_family != libc::AF_INET as libc::sa_family_t
        && sa.sin_family != libc::AF_UNSPEC as libc::sa_family_t
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not an IPv4 sockaddr",
        ));
    }
    Ok(Ipv4Addr::from(sa.sin_addr.s_addr.to_ne_bytes()))
}
