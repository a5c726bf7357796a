//! Name-keyed interface configuration.
//!
//! Every call opens a short-lived `AF_INET` datagram socket as the ioctl
//! target, fills a zeroed `ifreq` with the interface name, and issues one
//! request. The kernel resolves the interface by name, so the tunnel
//! descriptor itself is never involved.

use std::io;
use std::mem;
use std::net::Ipv4Addr;
use std::os::unix::io::AsRawFd;
use std::ptr;

use libc::{c_char, c_short, AF_INET, AF_INET6, IFF_UP, SOCK_DGRAM};

use crate::platform::posix::{sockaddr, Fd};
use crate::platform::sys;

pub(crate) fn ctl() -> io::Result<Fd> {
    Fd::new(unsafe { libc::socket(AF_INET, SOCK_DGRAM, 0) })
}

pub(crate) fn ctl_v6() -> io::Result<Fd> {
    Fd::new(unsafe { libc::socket(AF_INET6, SOCK_DGRAM, 0) })
}

/// Zeroed request carrying `name`.
///
/// # Safety
/// `name` must be shorter than `IFNAMSIZ`.
pub(crate) unsafe fn request(name: &str) -> libc::ifreq {
    debug_assert!(name.len() < libc::IFNAMSIZ);
    let mut req: libc::ifreq = mem::zeroed();
    ptr::copy_nonoverlapping(
        name.as_ptr() as *const c_char,
        req.ifr_name.as_mut_ptr(),
        name.len(),
    );
    req
}

#[cfg(target_os = "linux")]
pub(crate) fn if_index(name: &str) -> io::Result<u32> {
    let ifname = std::ffi::CString::new(name)?;
    let index = unsafe { libc::if_nametoindex(ifname.as_ptr()) };
    if index == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(index)
}

pub(crate) fn address(name: &str) -> io::Result<Ipv4Addr> {
    unsafe {
        let mut req = request(name);
        if let Err(err) = sys::siocgifaddr(ctl()?.as_raw_fd(), &mut req) {
            return Err(io::Error::from(err));
        }
        sockaddr::read_ipv4(ptr::addr_of!(req.ifr_ifru.ifru_addr))
    }
}

pub(crate) fn set_address(name: &str, value: Ipv4Addr) -> io::Result<()> {
    unsafe {
        let mut req = request(name);
        sockaddr::write_ipv4(ptr::addr_of_mut!(req.ifr_ifru.ifru_addr), value);
        if let Err(err) = sys::siocsifaddr(ctl()?.as_raw_fd(), &req) {
            return Err(io::Error::from(err));
        }
        Ok(())
    }
}

pub(crate) fn destination(name: &str) -> io::Result<Ipv4Addr> {
    unsafe {
        let mut req = request(name);
        if let Err(err) = sys::siocgifdstaddr(ctl()?.as_raw_fd(), &mut req) {
            return Err(io::Error::from(err));
        }
        sockaddr::read_ipv4(ptr::addr_of!(req.ifr_ifru.ifru_dstaddr))
    }
}

pub(crate) fn set_destination(name: &str, value: Ipv4Addr) -> io::Result<()> {
    unsafe {
        let mut req = request(name);
        sockaddr::write_ipv4(ptr::addr_of_mut!(req.ifr_ifru.ifru_dstaddr), value);
        if let Err(err) = sys::siocsifdstaddr(ctl()?.as_raw_fd(), &req) {
            return Err(io::Error::from(err));
        }
        Ok(())
    }
}

// The netmask travels in the union's address slot: Apple's ifreq defines no
// ifru_netmask member, and all sockaddr members alias the same bytes anyway.

pub(crate) fn netmask(name: &str) -> io::Result<Ipv4Addr> {
    unsafe {
        let mut req = request(name);
        if let Err(err) = sys::siocgifnetmask(ctl()?.as_raw_fd(), &mut req) {
            return Err(io::Error::from(err));
        }
        sockaddr::read_ipv4(ptr::addr_of!(req.ifr_ifru.ifru_addr))
    }
}

pub(crate) fn set_netmask(name: &str, value: Ipv4Addr) -> io::Result<()> {
    unsafe {
        let mut req = request(name);
        sockaddr::write_ipv4(ptr::addr_of_mut!(req.ifr_ifru.ifru_addr), value);
        if let Err(err) = sys::siocsifnetmask(ctl()?.as_raw_fd(), &req) {
            return Err(io::Error::from(err));
        }
        Ok(())
    }
}

pub(crate) fn mtu(name: &str) -> io::Result<u16> {
    unsafe {
        let mut req = request(name);
        if let Err(err) = sys::siocgifmtu(ctl()?.as_raw_fd(), &mut req) {
            return Err(io::Error::from(err));
        }
        req.ifr_ifru
            .ifru_mtu
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "MTU out of range"))
    }
}

pub(crate) fn set_mtu(name: &str, value: u16) -> io::Result<()> {
    unsafe {
        let mut req = request(name);
        req.ifr_ifru.ifru_mtu = value as i32;
        if let Err(err) = sys::siocsifmtu(ctl()?.as_raw_fd(), &req) {
            return Err(io::Error::from(err));
        }
        Ok(())
    }
}

pub(crate) fn flags(name: &str) -> io::Result<c_short> {
    unsafe {
        let mut req = request(name);
        if let Err(err) = sys::siocgifflags(ctl()?.as_raw_fd(), &mut req) {
            return Err(io::Error::from(err));
        }
        Ok(req.ifr_ifru.ifru_flags)
    }
}

pub(crate) fn is_enabled(name: &str) -> io::Result<bool> {
    Ok(flags(name)? & IFF_UP as c_short != 0)
}

/// Read-modify-write on `IFF_UP`; the set ioctl is issued only when the bit
/// actually changes, so raising an already-up interface touches nothing.
pub(crate) fn set_enabled(name: &str, value: bool) -> io::Result<()> {
    unsafe {
        let ctl = ctl()?;
        let mut req = request(name);
        if let Err(err) = sys::siocgifflags(ctl.as_raw_fd(), &mut req) {
            return Err(io::Error::from(err));
        }
        let up = IFF_UP as c_short;
        let current = req.ifr_ifru.ifru_flags;
        let wanted = if value { current | up } else { current & !up };
        if wanted == current {
            return Ok(());
        }
        req.ifr_ifru.ifru_flags = wanted;
        if let Err(err) = sys::siocsifflags(ctl.as_raw_fd(), &req) {
            return Err(io::Error::from(err));
        }
        Ok(())
    }
}
