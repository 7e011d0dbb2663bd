//! Fault classification and the errors the fault path can return.

use thiserror::Error;

use crate::errno;

/// The kind of access that missed in the TLB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FaultType {
    /// A load found no valid translation.
    Read = 0,
    /// A store found no valid translation.
    Write = 1,
    /// A store hit a translation without the dirty bit.
    ReadOnly = 2,
}

impl TryFrom<u32> for FaultType {
    type Error = FaultError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            2 => Ok(Self::ReadOnly),
            _ => Err(FaultError::InvalidArgument),
        }
    }
}

/// A fault the handler could not resolve.
///
/// Every variant is recoverable from the kernel's point of view: the trap dispatcher
/// terminates the faulting context. Invariant violations never show up here; they panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FaultError {
    /// The fault type code was not recognized.
    #[error("invalid fault type")]
    InvalidArgument,
    /// There was no process, or no address space, to resolve the fault against.
    #[error("fault with no user context")]
    FaultFatal,
    /// The address lies outside every segment and the stack.
    #[error("segmentation fault")]
    SegmentationFault,
}

impl FaultError {
    /// Returns the errno value reported for this error.
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument => errno::EINVAL,
            Self::FaultFatal | Self::SegmentationFault => errno::EFAULT,
        }
    }
}
