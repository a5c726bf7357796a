/*!
Handles for TUN/TAP virtual network interfaces on Linux and macOS.

A [`Device`] owns the descriptor of one virtual interface: packets the host
routes to the interface come out of [`Device::recv`], and packets written
with [`Device::send`] enter the host stack as if they arrived from the wire.
Addresses, netmask, MTU and interface state are configured through the same
handle.

Creating and configuring interfaces needs root (or `CAP_NET_ADMIN` on
Linux).

# Example
```no_run
use tunif::DeviceBuilder;

fn main() -> Result<(), tunif::BoxError> {
    let dev = DeviceBuilder::new()
        .address("10.0.8.1")
        .netmask("255.255.255.0")
        .mtu(1400)
        .enable(true)
        .build()?;
    println!("listening on {}", dev.name());
    let mut buf = [0u8; 65536];
    loop {
        let n = dev.recv(&mut buf)?;
        println!("packet: {} bytes", n);
    }
}
```

On Linux a TUN device delivers packets with a 4-byte packet-information
prefix unless `InterfaceFlags::NO_PI` was set; macOS utun devices always
carry a 4-byte protocol-family prefix.
*/

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
compile_error!("this crate supports Linux and macOS only");

pub use crate::address::IntoAddress;
#[cfg(target_os = "linux")]
pub use crate::builder::InterfaceFlags;
pub use crate::builder::DeviceBuilder;
pub use crate::error::{BoxError, Error, Result};
pub use crate::platform::Device;

mod address;
mod builder;
mod error;
pub mod platform;

/// Length of the metadata prefix in front of each packet, when present.
pub const PACKET_INFORMATION_LENGTH: usize = 4;
