use tunif::{BoxError, DeviceBuilder};

fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    let dev = DeviceBuilder::new()
        .address("10.0.8.1")
        .netmask("255.255.255.0")
        .destination("10.0.8.2")
        .mtu(1400)
        .enable(true)
        .build()?;
    println!("dumping packets from {}", dev.name());
    let mut buf = [0u8; 65536];
    loop {
        let amount = dev.recv(&mut buf)?;
        println!("{amount:>5} bytes: {:02x?}", &buf[..amount.min(32)]);
    }
}
