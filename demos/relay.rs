//! Bridges one TUN interface to a UDP peer running the same program on
//! another host, giving the two ends a private 10.0.8.0/24 link.

use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;

use tunif::{BoxError, DeviceBuilder};

fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    let mut args = std::env::args().skip(1);
    let local = args.next().expect("usage: relay <local-udp> <peer-udp>");
    let peer = args.next().expect("usage: relay <local-udp> <peer-udp>");

    let builder = DeviceBuilder::new()
        .address("10.0.8.1")
        .destination("10.0.8.2")
        .netmask("255.255.255.0")
        .mtu(1400)
        .enable(true);
    #[cfg(target_os = "linux")]
    let builder = builder.flags(tunif::InterfaceFlags::TUN | tunif::InterfaceFlags::NO_PI);
    let dev = Arc::new(builder.build()?);
    println!("relaying {} over {local} to {peer}", dev.name());

    let socket = Arc::new(UdpSocket::bind(&local)?);
    socket.connect(&peer)?;

    let dev_r = dev.clone();
    let socket_w = socket.clone();
    let _outbound = thread::spawn(move || -> Result<(), BoxError> {
        let mut buf = [0u8; 65536];
        loop {
            let amount = dev_r.recv(&mut buf)?;
            socket_w.send(&buf[..amount])?;
        }
    });

    let mut buf = [0u8; 65536];
    loop {
        let amount = socket.recv(&mut buf)?;
        dev.send(&buf[..amount])?;
    }
}
