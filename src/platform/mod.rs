pub(crate) mod posix;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::Device;
#[cfg(target_os = "linux")]
pub(crate) use self::linux::sys;

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "macos")]
pub use self::macos::Device;
#[cfg(target_os = "macos")]
pub(crate) use self::macos::sys;
