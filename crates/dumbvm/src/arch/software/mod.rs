//! Software emulation implementation for testing and development.
//!
//! This module provides a software-emulated architecture that can run on any host.
//! It's designed for testing the fault path without a MIPS core underneath.
//!
//! The software-emulated architecture is a "scale model" of the MIPS R3000:
//! - 16-bit virtual addresses (vs 32-bit on the R3000)
//! - 15-bit physical addresses, so the whole of RAM fits in the direct map
//! - 4-bit page offset (16-byte pages, vs 4 KiB)
//! - 8 TLB slots (vs 64)
//! - 2 levels of page tables with 6-bit indexes (64 entries per table)
//!
//! The upper half of the address space (`0x8000..`) plays the role of kseg0.

mod interrupts;
mod tlb;

pub use interrupts::EmulatedInterrupts;
pub use tlb::EmulatedTlb;

/// Maximum number of bits in a physical address for software emulation.
pub const MAX_PHYSICAL_BITS: usize = 15;

/// Maximum number of bits in a virtual address for software emulation.
pub const MAX_VIRTUAL_BITS: usize = 16;

/// Page size in bytes (16 bytes = 2^4).
pub const PAGE_SIZE: usize = 16;

/// Number of slots in the emulated TLB.
pub const NUM_TLB: usize = 8;

/// Number of pages reserved for each user stack.
pub const STACK_PAGES: usize = 12;

/// Base of the kernel direct map. Physical address `p` is visible at `KSEG0 + p`.
pub const KSEG0: usize = 0x8000;

/// Top of the user stack (exclusive). The stack grows down from here.
pub const USER_STACK: usize = KSEG0;

/// Number of page table levels (level 1 directory, level 0 table).
pub const PAGE_TABLE_LEVELS: usize = 2;

/// Number of entries in each page table level.
pub const ENTRY_COUNT: usize = 64;

/// Returns the page table index for a given virtual address at the specified level.
///
/// For software emulation:
/// - Level 0: Bits 4-9 (page table)
/// - Level 1: Bits 10-15 (page directory)
#[inline]
pub const fn page_index(address: usize, level: usize) -> usize {
    assert!(
        level < PAGE_TABLE_LEVELS,
        "level out of range for software emulation (0-1)"
    );
    let shift = 4 + (level * 6);
    (address >> shift) & (ENTRY_COUNT - 1)
}

/// Validates a physical address for software emulation.
#[inline]
pub const fn validate_physical(addr: usize) -> bool {
    addr < (1 << MAX_PHYSICAL_BITS)
}

/// Validates a virtual address for software emulation.
#[inline]
pub const fn validate_virtual(addr: usize) -> bool {
    addr < (1 << MAX_VIRTUAL_BITS)
}
