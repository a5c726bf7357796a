use libc::{c_int, ifreq, in6_ifreq};
use nix::{ioctl_read_bad, ioctl_write_int, ioctl_write_ptr, ioctl_write_ptr_bad};

ioctl_read_bad!(siocgifflags, 0x8913, ifreq);
ioctl_write_ptr_bad!(siocsifflags, 0x8914, ifreq);
ioctl_read_bad!(siocgifaddr, 0x8915, ifreq);
ioctl_write_ptr_bad!(siocsifaddr, 0x8916, ifreq);
ioctl_write_ptr_bad!(siocsifaddr_in6, 0x8916, in6_ifreq);
ioctl_read_bad!(siocgifdstaddr, 0x8917, ifreq);
ioctl_write_ptr_bad!(siocsifdstaddr, 0x8918, ifreq);
ioctl_read_bad!(siocgifnetmask, 0x891b, ifreq);
ioctl_write_ptr_bad!(siocsifnetmask, 0x891c, ifreq);
ioctl_read_bad!(siocgifmtu, 0x8921, ifreq);
ioctl_write_ptr_bad!(siocsifmtu, 0x8922, ifreq);
ioctl_write_ptr_bad!(siocsifhwaddr, 0x8924, ifreq);
ioctl_read_bad!(siocgifhwaddr, 0x8927, ifreq);

ioctl_write_ptr!(tunsetiff, b'T', 202, c_int);
// TUNSETPERSIST takes its argument by value, not behind a pointer.
ioctl_write_int!(tunsetpersist, b'T', 203);
ioctl_write_ptr!(tunsetqueue, b'T', 217, c_int);
