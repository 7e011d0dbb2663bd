//! Architecture-specific implementations for TLB and interrupt management.
//!
//! This module conditionally imports either the MIPS R3000 hardware implementation
//! or software emulation based on the target architecture and features.

// Use the R3000 implementation when we're on MIPS and not testing or emulating.
#[cfg(all(target_arch = "mips", not(test), not(feature = "software-emulation")))]
mod mips;
#[cfg(all(target_arch = "mips", not(test), not(feature = "software-emulation")))]
pub use mips::*;

// Use software emulation when:
// - Running tests, OR
// - software-emulation feature is explicitly enabled, OR
// - the target has no software-managed TLB to drive
#[cfg(any(test, feature = "software-emulation", not(target_arch = "mips")))]
mod software;
#[cfg(any(test, feature = "software-emulation", not(target_arch = "mips")))]
pub use software::*;
