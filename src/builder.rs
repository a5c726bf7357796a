use std::net::Ipv4Addr;

use crate::address::IntoAddress;
use crate::error::Result;
use crate::platform::Device;

#[cfg(target_os = "linux")]
use crate::error::Error;

#[cfg(target_os = "linux")]
bitflags::bitflags! {
    /// Flags handed to the kernel when the interface is attached.
    ///
    /// Exactly one of [`TUN`](Self::TUN) and [`TAP`](Self::TAP) must be set;
    /// the rest are modifiers. The bit values are the tun driver's own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterfaceFlags: u16 {
        /// Network-layer device: raw IP packets, no Ethernet framing.
        const TUN = 0x0001;
        /// Link-layer device: Ethernet frames, has a hardware address.
        const TAP = 0x0002;
        /// Drop the 4-byte packet-information prefix from reads and writes.
        const NO_PI = 0x1000;
        /// Legacy single-queue behavior.
        const ONE_QUEUE = 0x2000;
        /// Allow several descriptors to serve the interface as parallel
        /// queues, see [`Device::attach_queue`](crate::Device::attach_queue).
        const MULTI_QUEUE = 0x0100;
        /// Fail instead of attaching to a preexisting interface.
        const TUN_EXCL = 0x8000;
    }
}

#[cfg(target_os = "linux")]
impl InterfaceFlags {
    pub(crate) fn validate(self) -> Result<()> {
        let mode = self & (InterfaceFlags::TUN | InterfaceFlags::TAP);
        if mode != InterfaceFlags::TUN && mode != InterfaceFlags::TAP {
            return Err(Error::InvalidFlags);
        }
        Ok(())
    }
}

/// Creation parameters passed through to the platform opener.
#[derive(Clone, Default, Debug)]
pub(crate) struct DeviceConfig {
    pub(crate) name: Option<String>,
    #[cfg(target_os = "linux")]
    pub(crate) flags: Option<InterfaceFlags>,
    #[cfg(target_os = "linux")]
    pub(crate) dev_path: Option<String>,
}

/// Builder for a [`Device`].
///
/// All parameters are optional. With none set, the kernel picks the next
/// free TUN interface (Linux) or utun unit (macOS), left down and
/// unaddressed.
#[derive(Default)]
pub struct DeviceBuilder {
    name: Option<String>,
    #[cfg(target_os = "linux")]
    flags: Option<InterfaceFlags>,
    #[cfg(target_os = "linux")]
    dev_path: Option<String>,
    address: Option<Result<Ipv4Addr>>,
    netmask: Option<Result<Ipv4Addr>>,
    destination: Option<Result<Ipv4Addr>>,
    mtu: Option<u16>,
    enabled: Option<bool>,
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an interface name. Linux accepts any name below the length
    /// limit, including `%d` patterns the kernel numbers itself; macOS only
    /// accepts `utunN`.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Select TUN or TAP and creation modifiers. Defaults to a plain TUN
    /// device with packet information.
    #[cfg(target_os = "linux")]
    pub fn flags(mut self, flags: InterfaceFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Open a clone device other than `/dev/net/tun`.
    #[cfg(target_os = "linux")]
    pub fn device_path<S: Into<String>>(mut self, dev_path: S) -> Self {
        self.dev_path = Some(dev_path.into());
        self
    }

    pub fn address<A: IntoAddress>(mut self, value: A) -> Self {
        self.address = Some(value.into_address());
        self
    }

    pub fn netmask<A: IntoAddress>(mut self, value: A) -> Self {
        self.netmask = Some(value.into_address());
        self
    }

    pub fn destination<A: IntoAddress>(mut self, value: A) -> Self {
        self.destination = Some(value.into_address());
        self
    }

    pub fn mtu(mut self, mtu: u16) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Bring the interface up (or explicitly down) once it is configured.
    /// Without this the interface is left in whatever state the kernel
    /// created it in, which is down.
    pub fn enable(mut self, enable: bool) -> Self {
        self.enabled = Some(enable);
        self
    }

    /// Create the device, then apply the requested configuration in order:
    /// address, netmask, destination, MTU, up/down. Stored parameters are
    /// validated before anything is created.
    pub fn build(self) -> Result<Device> {
        let address = self.address.transpose()?;
        let netmask = self.netmask.transpose()?;
        let destination = self.destination.transpose()?;

        let device = Device::new(DeviceConfig {
            name: self.name,
            #[cfg(target_os = "linux")]
            flags: self.flags,
            #[cfg(target_os = "linux")]
            dev_path: self.dev_path,
        })?;
        if let Some(address) = address {
            device.set_address(address)?;
        }
        if let Some(netmask) = netmask {
            device.set_netmask(netmask)?;
        }
        if let Some(destination) = destination {
            device.set_destination(destination)?;
        }
        if let Some(mtu) = self.mtu {
            device.set_mtu(mtu)?;
        }
        if let Some(enabled) = self.enabled {
            device.enabled(enabled)?;
        }
        Ok(device)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    #[cfg(target_os = "linux")]
    #[test]
    fn flag_validation_requires_exactly_one_mode() {
        assert!(matches!(
            InterfaceFlags::empty().validate(),
            Err(Error::InvalidFlags)
        ));
        assert!(matches!(
            (InterfaceFlags::TUN | InterfaceFlags::TAP).validate(),
            Err(Error::InvalidFlags)
        ));
        assert!(InterfaceFlags::TUN.validate().is_ok());
        assert!(InterfaceFlags::TAP.validate().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn modifier_bits_do_not_count_as_a_mode() {
        assert!(matches!(
            (InterfaceFlags::NO_PI | InterfaceFlags::ONE_QUEUE).validate(),
            Err(Error::InvalidFlags)
        ));
        assert!((InterfaceFlags::TAP | InterfaceFlags::NO_PI | InterfaceFlags::MULTI_QUEUE)
            .validate()
            .is_ok());
    }

    // These fail during parameter validation, before any descriptor is
    // opened, so they need no privileges.

    #[test]
    fn build_rejects_malformed_address_before_opening() {
        let err = DeviceBuilder::new()
            .address("not-an-address")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress));
    }

    #[test]
    fn build_rejects_malformed_netmask_before_opening() {
        let err = DeviceBuilder::new().netmask("255.255.255").build().unwrap_err();
        assert!(matches!(err, Error::InvalidAddress));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn build_rejects_conflicting_modes_before_opening() {
        let err = DeviceBuilder::new()
            .flags(InterfaceFlags::TUN | InterfaceFlags::TAP)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFlags));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn build_rejects_overlong_name_before_opening() {
        let err = DeviceBuilder::new()
            .name("a".repeat(libc::IFNAMSIZ))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::NameTooLong));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn build_rejects_foreign_name_before_opening() {
        let err = DeviceBuilder::new().name("tun0").build().unwrap_err();
        assert!(matches!(err, Error::InvalidName));
    }
}
