use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Error, Result};

/// Conversion of caller-supplied values into IPv4 addresses.
///
/// String forms must be dotted-decimal. Anything else fails with
/// [`Error::InvalidAddress`] before any system call is issued.
pub trait IntoAddress {
    fn into_address(&self) -> Result<Ipv4Addr>;
}

impl IntoAddress for str {
    fn into_address(&self) -> Result<Ipv4Addr> {
        self.parse().map_err(|_| Error::InvalidAddress)
    }
}

impl IntoAddress for String {
    fn into_address(&self) -> Result<Ipv4Addr> {
        self.as_str().into_address()
    }
}

impl IntoAddress for Ipv4Addr {
    fn into_address(&self) -> Result<Ipv4Addr> {
        Ok(*self)
    }
}

impl IntoAddress for IpAddr {
    fn into_address(&self) -> Result<Ipv4Addr> {
        match self {
            IpAddr::V4(value) => Ok(*value),
            IpAddr::V6(_) => Err(Error::InvalidAddress),
        }
    }
}

impl<T: IntoAddress + ?Sized> IntoAddress for &T {
    fn into_address(&self) -> Result<Ipv4Addr> {
        (**self).into_address()
    }
}
