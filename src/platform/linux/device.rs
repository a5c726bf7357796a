use std::ffi::{CStr, CString};
use std::io;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, RawFd};
use std::ptr;

use libc::{
    self, c_char, c_short, ifreq, in6_ifreq, ARPHRD_ETHER, IFF_ATTACH_QUEUE, IFF_DETACH_QUEUE,
    IFNAMSIZ, O_RDWR,
};

use crate::builder::{DeviceConfig, InterfaceFlags};
use crate::error::{Error, Result};
use crate::platform::linux::sys::*;
use crate::platform::posix::{ifcfg, Fd};
use crate::IntoAddress;

const ETHER_ADDR_LEN: usize = 6;

/// A handle to one TUN or TAP interface backed by the Linux tun driver.
///
/// The interface exists as long as the descriptor stays open, unless it was
/// made persistent. Configuration goes through a short-lived control socket
/// keyed by the interface name, never through the tunnel descriptor.
#[derive(Debug)]
pub struct Device {
    fd: Fd,
    name: String,
}

impl Device {
    pub(crate) fn new(config: DeviceConfig) -> Result<Self> {
        let flags = config.flags.unwrap_or(InterfaceFlags::TUN);
        flags.validate()?;
        let name = config.name.as_deref().map(validate_name).transpose()?;
        let mut req = attach_request(name.as_ref(), flags);

        let path = CString::new(config.dev_path.as_deref().unwrap_or("/dev/net/tun"))?;
        let fd = unsafe { libc::open(path.as_ptr(), O_RDWR) };
        let fd = Fd::new(fd)?;
        unsafe {
            if let Err(err) = tunsetiff(fd.as_raw_fd(), &mut req as *mut _ as *mut _) {
                return Err(io::Error::from(err).into());
            }
        }
        // The kernel writes the final name back, which matters when no name
        // was requested and it picked the next free tunN.
        let name = unsafe { CStr::from_ptr(req.ifr_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        log::debug!("attached to {name}");
        Ok(Device { fd, name })
    }

    /// Interface name as the kernel reported it at creation time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive one packet. The OS hands over at most one packet per call and
    /// reports its length; a buffer shorter than the packet truncates it.
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

    /// Hardware address of a TAP interface. TUN interfaces carry none and
    /// the kernel rejects the request for them.
    pub fn mac_address(&self) -> Result<[u8; ETHER_ADDR_LEN]> {
        unsafe {
            let mut req = ifcfg::request(&self.name);
            if let Err(err) = siocgifhwaddr(ifcfg::ctl()?.as_raw_fd(), &mut req) {
                return Err(io::Error::from(err).into());
            }
            let mut mac = [0u8; ETHER_ADDR_LEN];
            for (dst, src) in mac.iter_mut().zip(req.ifr_ifru.ifru_hwaddr.sa_data.iter()) {
                *dst = *src as u8;
            }
            Ok(mac)
        }
    }

    pub fn set_mac_address(&self, eth_addr: [u8; ETHER_ADDR_LEN]) -> Result<()> {
        unsafe {
            let mut req = ifcfg::request(&self.name);
            req.ifr_ifru.ifru_hwaddr.sa_family = ARPHRD_ETHER;
            req.ifr_ifru.ifru_hwaddr.sa_data[..ETHER_ADDR_LEN]
                .copy_from_slice(eth_addr.map(|c| c as _).as_slice());
            if let Err(err) = siocsifhwaddr(ifcfg::ctl()?.as_raw_fd(), &req) {
                return Err(io::Error::from(err).into());
            }
            Ok(())
        }
    }

    /// Add an IPv6 address with the given prefix length.
    pub fn add_address_v6(&self, addr: Ipv6Addr, prefix: u8) -> Result<()> {
        ipnet::Ipv6Net::new(addr, prefix).map_err(|_| Error::InvalidAddress)?;
        let index = ifcfg::if_index(&self.name)?;
        unsafe {
            let ctl = ifcfg::ctl_v6()?;
            let mut req: in6_ifreq = mem::zeroed();
            req.ifr6_addr = libc::in6_addr {
                s6_addr: addr.octets(),
            };
            req.ifr6_prefixlen = prefix as u32;
            req.ifr6_ifindex = index as i32;
            if let Err(err) = siocsifaddr_in6(ctl.as_raw_fd(), &req) {
                return Err(io::Error::from(err).into());
            }
        }
        Ok(())
    }

    /// Keep the interface alive after every descriptor is gone, or undo a
    /// previous persist.
    pub fn persist(&self, on: bool) -> Result<()> {
        unsafe {
            if let Err(err) = tunsetpersist(self.as_raw_fd(), on as _) {
                return Err(io::Error::from(err).into());
            }
        }
        Ok(())
    }

    /// Attach this descriptor as an active queue of a multi-queue interface,
    /// or detach it. The interface must have been created with
    /// [`InterfaceFlags::MULTI_QUEUE`].
    pub fn attach_queue(&self, attach: bool) -> Result<()> {
        let state = if attach {
            IFF_ATTACH_QUEUE
        } else {
            IFF_DETACH_QUEUE
        };
        unsafe {
            let mut req: ifreq = mem::zeroed();
            req.ifr_ifru.ifru_flags = state as c_short;
            if let Err(err) = tunsetqueue(self.as_raw_fd(), &mut req as *mut _ as *mut _) {
                return Err(io::Error::from(err).into());
            }
            Ok(())
        }
    }
}

/// Build the attach request handed to TUNSETIFF.
fn attach_request(name: Option<&CString>, flags: InterfaceFlags) -> ifreq {
    unsafe {
        let mut req: ifreq = mem::zeroed();
        if let Some(name) = name {
            ptr::copy_nonoverlapping(
                name.as_ptr() as *const c_char,
                req.ifr_name.as_mut_ptr(),
                name.as_bytes_with_nul().len(),
            );
        }
        req.ifr_ifru.ifru_flags = flags.bits() as c_short;
        req
    }
}

fn validate_name(name: &str) -> Result<CString> {
    let name = CString::new(name)?;
    if name.as_bytes_with_nul().len() > IFNAMSIZ {
        return Err(Error::NameTooLong);
    }
    Ok(name)
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
