#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Neither or both of `TUN`/`TAP` were requested at creation.
    #[error("exactly one of TUN or TAP must be set")]
    InvalidFlags,

    #[error("interface name too long")]
    NameTooLong,

    #[error("invalid interface name")]
    InvalidName,

    #[error("bad IP address")]
    InvalidAddress,

    #[error("MTU must be greater than zero")]
    InvalidMtu,

    /// Every candidate utun unit up to the probing cap was busy.
    #[error("no available utun unit")]
    NoAvailableUnit,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Nul(#[from] std::ffi::NulError),

    #[error(transparent)]
    ParseNum(#[from] std::num::ParseIntError),
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(err) => err,
            _ => std::io::Error::new(std::io::ErrorKind::InvalidInput, value),
        }
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;
