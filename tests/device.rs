//! Tests that create real interfaces. They need root (plus /dev/net/tun on
//! Linux); anywhere else they print a notice and pass vacuously.

use std::net::Ipv4Addr;
use std::os::unix::io::AsRawFd;

use tunif::{DeviceBuilder, Error};

#[cfg(target_os = "linux")]
use tunif::InterfaceFlags;

fn privileged() -> bool {
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("skipping: needs root");
        return false;
    }
    #[cfg(target_os = "linux")]
    if !std::path::Path::new("/dev/net/tun").exists() {
        eprintln!("skipping: /dev/net/tun not present");
        return false;
    }
    true
}

#[cfg(target_os = "linux")]
const KERNEL_NAME_PREFIX: &str = "tun";
#[cfg(target_os = "macos")]
const KERNEL_NAME_PREFIX: &str = "utun";

#[test]
fn kernel_assigns_a_name_when_none_requested() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().build().unwrap();
    assert!(dev.name().starts_with(KERNEL_NAME_PREFIX), "{}", dev.name());
}

#[test]
fn honors_the_requested_name() {
    if !privileged() {
        return;
    }
    #[cfg(target_os = "linux")]
    let wanted = "tift0";
    #[cfg(target_os = "macos")]
    let wanted = "utun77";
    let dev = DeviceBuilder::new().name(wanted).build().unwrap();
    assert_eq!(dev.name(), wanted);
}

#[test]
fn addresses_round_trip_and_the_descriptor_stays_put() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().build().unwrap();
    let fd = dev.as_raw_fd();

    dev.set_address("10.41.0.1").unwrap();
    dev.set_netmask("255.255.255.0").unwrap();
    dev.set_destination("10.41.0.2").unwrap();

    assert_eq!(dev.address().unwrap(), Ipv4Addr::new(10, 41, 0, 1));
    assert_eq!(dev.netmask().unwrap(), Ipv4Addr::new(255, 255, 255, 0));
    assert_eq!(dev.destination().unwrap(), Ipv4Addr::new(10, 41, 0, 2));
    // Configuration goes through throwaway control sockets, never through
    // the tunnel descriptor.
    assert_eq!(dev.as_raw_fd(), fd);
}

#[test]
fn rejects_malformed_addresses_without_touching_the_interface() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().build().unwrap();
    dev.set_address("10.42.0.1").unwrap();

    let err = dev.set_address("300.1.2.3").unwrap_err();
    assert!(matches!(err, Error::InvalidAddress));
    assert_eq!(dev.address().unwrap(), Ipv4Addr::new(10, 42, 0, 1));
}

#[test]
fn mtu_round_trips_and_zero_is_refused() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().build().unwrap();
    dev.set_mtu(1400).unwrap();
    assert_eq!(dev.mtu().unwrap(), 1400);

    let err = dev.set_mtu(0).unwrap_err();
    assert!(matches!(err, Error::InvalidMtu));
    assert_eq!(dev.mtu().unwrap(), 1400);
}

#[test]
fn up_and_down_are_idempotent() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().build().unwrap();
    dev.set_address("10.43.0.1").unwrap();
    dev.set_netmask("255.255.255.0").unwrap();

    assert!(!dev.is_enabled().unwrap());
    dev.enabled(true).unwrap();
    assert!(dev.is_enabled().unwrap());
    dev.enabled(true).unwrap();
    assert!(dev.is_enabled().unwrap());

    dev.enabled(false).unwrap();
    assert!(!dev.is_enabled().unwrap());
    dev.enabled(false).unwrap();
    assert!(!dev.is_enabled().unwrap());
}

#[test]
fn close_is_idempotent_and_io_reports_bad_descriptor() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().build().unwrap();
    dev.close();
    dev.close();

    let mut buf = [0u8; 2048];
    let err = dev.recv(&mut buf).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    let err = dev.send(&buf[..64]).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::EBADF));
}

#[test]
fn nonblocking_recv_reports_would_block() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().build().unwrap();
    assert!(!dev.is_nonblocking().unwrap());
    dev.set_nonblocking(true).unwrap();
    assert!(dev.is_nonblocking().unwrap());

    let mut buf = [0u8; 2048];
    let err = dev.recv(&mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
}

#[cfg(target_os = "linux")]
#[test]
fn tap_devices_expose_their_hardware_address() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new()
        .name("tifm0")
        .flags(InterfaceFlags::TAP | InterfaceFlags::NO_PI)
        .build()
        .unwrap();

    let mac = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
    dev.set_mac_address(mac).unwrap();
    assert_eq!(dev.mac_address().unwrap(), mac);

    let reported = mac_address::mac_address_by_name(dev.name())
        .unwrap()
        .unwrap();
    assert_eq!(reported.bytes(), mac);
}

#[cfg(target_os = "linux")]
#[test]
fn persist_keeps_the_interface_across_descriptors() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new().name("tifp0").build().unwrap();
    dev.persist(true).unwrap();
    drop(dev);

    // The interface must still exist, so attaching by name succeeds.
    let dev = DeviceBuilder::new().name("tifp0").build().unwrap();
    assert_eq!(dev.name(), "tifp0");
    dev.persist(false).unwrap();
}

#[cfg(target_os = "linux")]
#[test]
fn queues_detach_and_reattach() {
    if !privileged() {
        return;
    }
    let dev = DeviceBuilder::new()
        .name("tifq0")
        .flags(InterfaceFlags::TUN | InterfaceFlags::NO_PI | InterfaceFlags::MULTI_QUEUE)
        .build()
        .unwrap();
    dev.attach_queue(false).unwrap();
    dev.attach_queue(true).unwrap();
}

#[cfg(target_os = "linux")]
#[test]
fn receives_udp_pushed_into_the_tunnel() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use pnet_packet::ip::IpNextHeaderProtocols;
    use pnet_packet::Packet;

    if !privileged() {
        return;
    }
    let test_msg = "tunnel me";
    let device = DeviceBuilder::new()
        .flags(InterfaceFlags::TUN | InterfaceFlags::NO_PI)
        .address("10.26.9.100")
        .netmask("255.255.255.0")
        .enable(true)
        .build()
        .unwrap();
    let device = Arc::new(device);
    let seen = Arc::new(AtomicBool::new(false));

    let reader = device.clone();
    let seen_w = seen.clone();
    std::thread::spawn(move || {
        let mut buf = [0; 65535];
        loop {
            let len = reader.recv(&mut buf).unwrap();
            if let Some(ipv4_packet) = pnet_packet::ipv4::Ipv4Packet::new(&buf[..len]) {
                if ipv4_packet.get_next_level_protocol() == IpNextHeaderProtocols::Udp {
                    if let Some(udp_packet) =
                        pnet_packet::udp::UdpPacket::new(ipv4_packet.payload())
                    {
                        if udp_packet.payload() == test_msg.as_bytes() {
                            seen_w.store(true, Ordering::SeqCst);
                        }
                    }
                }
            }
        }
    });

    std::thread::sleep(Duration::from_millis(300));
    let udp_socket = std::net::UdpSocket::bind("10.26.9.100:0").unwrap();
    udp_socket
        .send_to(test_msg.as_bytes(), "10.26.9.101:9909")
        .unwrap();

    for _ in 0..30 {
        if seen.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    assert!(seen.load(Ordering::SeqCst));
}
