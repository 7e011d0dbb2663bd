//! MIPS R3000 implementation.
//!
//! The R3000 has a 64-entry, fully associative, software-refilled TLB. Addresses below
//! `0x8000_0000` (kuseg) are translated through it; kseg0 (`0x8000_0000..0xA000_0000`)
//! is a cached direct map of the first 512 MiB of physical memory.

mod interrupts;
mod tlb;

pub use interrupts::StatusInterrupts;
pub use tlb::R3000Tlb;

/// Maximum number of bits in a physical address reachable through kseg0.
pub const MAX_PHYSICAL_BITS: usize = 29;

/// Page size in bytes (4 KiB).
pub const PAGE_SIZE: usize = 4096;

/// Number of slots in the R3000 TLB.
pub const NUM_TLB: usize = 64;

/// Number of pages reserved for each user stack.
pub const STACK_PAGES: usize = 12;

/// Base of the kernel direct map (kseg0).
pub const KSEG0: usize = 0x8000_0000;

/// Top of the user stack (exclusive), the end of kuseg.
pub const USER_STACK: usize = KSEG0;

/// Number of page table levels (level 1 directory, level 0 table).
pub const PAGE_TABLE_LEVELS: usize = 2;

/// Number of entries in each page table level.
pub const ENTRY_COUNT: usize = 1024;

/// Returns the page table index for a given virtual address at the specified level.
///
/// - Level 0: Bits 12-21 (page table)
/// - Level 1: Bits 22-31 (page directory)
#[inline]
pub const fn page_index(address: usize, level: usize) -> usize {
    assert!(level < PAGE_TABLE_LEVELS, "level out of range for R3000 (0-1)");
    let shift = 12 + (level * 10);
    (address >> shift) & (ENTRY_COUNT - 1)
}

/// Validates a physical address: it must be reachable through kseg0.
#[inline]
pub const fn validate_physical(addr: usize) -> bool {
    addr < (1 << MAX_PHYSICAL_BITS)
}

/// Validates a virtual address. Every 32-bit value is a valid R3000 virtual address.
#[inline]
pub const fn validate_virtual(_addr: usize) -> bool {
    true
}
