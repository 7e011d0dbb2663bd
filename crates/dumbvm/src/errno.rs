//! Error numbers and signals reported to user space.

/// Function not implemented.
pub const EUNIMP: i32 = 2;
/// Out of memory.
pub const ENOMEM: i32 = 3;
/// Bad memory reference.
pub const EFAULT: i32 = 6;
/// Invalid argument.
pub const EINVAL: i32 = 8;

/// Segmentation violation.
pub const SIGSEGV: i32 = 11;
