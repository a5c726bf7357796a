use std::ffi::CStr;
use std::io;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, RawFd};
use std::ptr;

use libc::{
    self, c_char, c_uint, c_void, socklen_t, AF_SYSTEM, AF_SYS_CONTROL, IFNAMSIZ, PF_SYSTEM,
    SOCK_DGRAM, SYSPROTO_CONTROL, UTUN_OPT_IFNAME,
};

use crate::builder::DeviceConfig;
use crate::error::{Error, Result};
use crate::platform::macos::sys::*;
use crate::platform::posix::{ifcfg, sockaddr, Fd};
use crate::IntoAddress;

/// Highest utun unit probed before the search is abandoned.
const MAX_UTUN_UNITS: u32 = 256;

/// A handle to one utun interface backed by the macOS utun kernel control.
///
/// The descriptor is a `PF_SYSTEM` socket connected to one control unit; the
/// interface disappears when the descriptor closes. Every packet crosses the
/// descriptor with a 4-byte protocol-family prefix.
#[derive(Debug)]
pub struct Device {
    fd: Fd,
    name: String,
}

impl Device {
    pub(crate) fn new(config: DeviceConfig) -> Result<Self> {
        let (fd, name) = match config.name.as_deref() {
            Some(name) => connect_unit(unit_from_name(name)?)?,
            None => probe_units()?,
        };
        log::debug!("connected to {name}");
        Ok(Device { fd, name })
    }

    /// Interface name as the kernel reported it at creation time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive one packet, protocol-family prefix included. The OS hands
    /// over at most one packet per call and reports its length.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.fd.read(buf)
    }

    /// Send one packet, returning how many bytes the OS accepted.
    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.fd.write(buf)
    }

    /// Release the descriptor early. Safe to call more than once; I/O
    /// through this handle afterwards fails with the OS bad-descriptor
    /// error.
    pub fn close(&self) {
        self.fd.close();
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.fd.set_nonblocking(nonblocking)
    }

    pub fn is_nonblocking(&self) -> io::Result<bool> {
        self.fd.is_nonblocking()
    }

    /// Bring the interface up or down.
    pub fn enabled(&self, value: bool) -> Result<()> {
        Ok(ifcfg::set_enabled(&self.name, value)?)
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(ifcfg::is_enabled(&self.name)?)
    }

    pub fn address(&self) -> Result<Ipv4Addr> {
        Ok(ifcfg::address(&self.name)?)
    }

    pub fn set_address<A: IntoAddress>(&self, value: A) -> Result<()> {
        Ok(ifcfg::set_address(&self.name, value.into_address()?)?)
    }

    /// Peer address of the point-to-point link.
    pub fn destination(&self) -> Result<Ipv4Addr> {
        Ok(ifcfg::destination(&self.name)?)
    }

    pub fn set_destination<A: IntoAddress>(&self, value: A) -> Result<()> {
        Ok(ifcfg::set_destination(&self.name, value.into_address()?)?)
    }

    pub fn netmask(&self) -> Result<Ipv4Addr> {
        Ok(ifcfg::netmask(&self.name)?)
    }

    pub fn set_netmask<A: IntoAddress>(&self, value: A) -> Result<()> {
        Ok(ifcfg::set_netmask(&self.name, value.into_address()?)?)
    }

    pub fn mtu(&self) -> Result<u16> {
        Ok(ifcfg::mtu(&self.name)?)
    }

    pub fn set_mtu(&self, value: u16) -> Result<()> {
        if value == 0 {
            return Err(Error::InvalidMtu);
        }
        Ok(ifcfg::set_mtu(&self.name, value)?)
    }

    /// Add an IPv6 address with the given prefix length. Duplicate address
    /// detection is skipped so the address is usable immediately.
    pub fn add_address_v6(&self, addr: Ipv6Addr, prefix: u8) -> Result<()> {
        let mask = ipnet::Ipv6Net::new(addr, prefix)
            .map_err(|_| Error::InvalidAddress)?
            .netmask();
        unsafe {
            let ctl = ifcfg::ctl_v6()?;
            let mut req: in6_ifaliasreq = mem::zeroed();
            ptr::copy_nonoverlapping(
                self.name.as_ptr() as *const c_char,
                req.ifra_name.as_mut_ptr(),
                self.name.len(),
            );
            req.ifra_addr = sockaddr::sockaddr_in6(addr);
            req.ifra_prefixmask = sockaddr::sockaddr_in6(mask);
            req.ifra_flags = IN6_IFF_NODAD;
            req.ifra_lifetime.ia6t_vltime = ND6_INFINITE_LIFETIME;
            req.ifra_lifetime.ia6t_pltime = ND6_INFINITE_LIFETIME;
            if let Err(err) = siocaifaddr_in6(ctl.as_raw_fd(), &req) {
                return Err(io::Error::from(err).into());
            }
        }
        Ok(())
    }
}

/// Map `utunN` to its control unit. Unit numbers are offset by one; unit 0
/// asks the kernel to pick, which the probe loop does explicitly instead.
fn unit_from_name(name: &str) -> Result<u32> {
    if name.len() + 1 > IFNAMSIZ {
        return Err(Error::NameTooLong);
    }
    let digits = name.strip_prefix("utun").ok_or(Error::InvalidName)?;
    let number: u32 = digits.parse()?;
    number.checked_add(1).ok_or(Error::InvalidName)
}

/// Fresh control socket with the utun control id resolved.
fn open_control() -> Result<(Fd, c_uint)> {
    let fd = unsafe { libc::socket(PF_SYSTEM, SOCK_DGRAM, SYSPROTO_CONTROL) };
    let fd = Fd::new(fd)?;
    let mut info = ctl_info {
        ctl_id: 0,
        ctl_name: {
            let mut buffer = [0; 96];
            for (i, o) in UTUN_CONTROL_NAME.as_bytes().iter().zip(buffer.iter_mut()) {
                *o = *i as _;
            }
            buffer
        },
    };
    unsafe {
        if let Err(err) = ctliocginfo(fd.as_raw_fd(), &mut info as *mut _ as *mut _) {
            return Err(io::Error::from(err).into());
        }
    }
    Ok((fd, info.ctl_id))
}

fn connect_control(fd: &Fd, ctl_id: c_uint, unit: u32) -> io::Result<()> {
    let addr = libc::sockaddr_ctl {
        sc_id: ctl_id,
        sc_len: mem::size_of::<libc::sockaddr_ctl>() as _,
        sc_family: AF_SYSTEM as _,
        ss_sysaddr: AF_SYS_CONTROL as _,
        sc_unit: unit as c_uint,
        sc_reserved: [0; 5],
    };
    let address = &addr as *const libc::sockaddr_ctl as *const libc::sockaddr;
    if unsafe { libc::connect(fd.as_raw_fd(), address, mem::size_of_val(&addr) as socklen_t) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Ask the kernel which name the connected unit got.
fn read_ifname(fd: &Fd) -> Result<String> {
    let mut ifname = [0u8; 64];
    let mut name_len: socklen_t = ifname.len() as socklen_t;
    let optval = &mut ifname as *mut _ as *mut c_void;
    let optlen = &mut name_len as *mut socklen_t;
    unsafe {
        if libc::getsockopt(fd.as_raw_fd(), SYSPROTO_CONTROL, UTUN_OPT_IFNAME, optval, optlen) < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(CStr::from_ptr(ifname.as_ptr() as *const c_char)
            .to_string_lossy()
            .into_owned())
    }
}

fn connect_unit(unit: u32) -> Result<(Fd, String)> {
    let (fd, ctl_id) = open_control()?;
    connect_control(&fd, ctl_id, unit)?;
    let name = read_ifname(&fd)?;
    Ok((fd, name))
}

/// Walk utun0 upwards until a unit connects. Every candidate gets a fresh
/// socket since a failed connect leaves the old one unusable. The cap keeps
/// a hostile kernel state from turning this into an endless scan.
fn probe_units() -> Result<(Fd, String)> {
    for unit in 1..=MAX_UTUN_UNITS {
        let (fd, ctl_id) = open_control()?;
        match connect_control(&fd, ctl_id, unit) {
            Ok(()) => {
                let name = read_ifname(&fd)?;
                return Ok((fd, name));
            }
            Err(err) => log::debug!("utun{} not available: {err}", unit - 1),
        }
    }
    Err(Error::NoAvailableUnit)
}

impl AsRawFd for Device {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for Device {
    fn as_fd(&self) -> BorrowedFd<'_> {
        unsafe { BorrowedFd::borrow_raw(self.as_raw_fd()) }
    }
}

impl IntoRawFd for Device {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn maps_names_to_offset_units() {
        assert_eq!(unit_from_name("utun0").unwrap(), 1);
        assert_eq!(unit_from_name("utun12").unwrap(), 13);
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(matches!(unit_from_name("tun0"), Err(Error::InvalidName)));
        assert!(matches!(unit_from_name("en0"), Err(Error::InvalidName)));
    }

    #[test]
    fn rejects_missing_or_malformed_unit_numbers() {
        assert!(matches!(unit_from_name("utun"), Err(Error::ParseNum(_))));
        assert!(matches!(unit_from_name("utunX"), Err(Error::ParseNum(_))));
        assert!(matches!(
            unit_from_name("utun4294967296"),
            Err(Error::ParseNum(_))
        ));
    }

    // utun4294967295 parses, but its control unit would be u32::MAX + 1.
    #[test]
    fn rejects_unit_numbers_with_no_room_for_the_offset() {
        assert!(matches!(
            unit_from_name("utun4294967295"),
            Err(Error::InvalidName)
        ));
    }

    #[test]
    fn rejects_names_at_the_length_limit() {
        assert!(matches!(
            unit_from_name("utun000000000000"),
            Err(Error::NameTooLong)
        ));
    }
}
