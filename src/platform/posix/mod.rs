mod fd;
pub(crate) use self::fd::Fd;

pub(crate) mod ifcfg;
pub(crate) mod sockaddr;
