//! Translation lookaside buffer model.
//!
//! The TLB is software-managed: the hardware only ever consults it, and every miss traps
//! into [`Vm::handle_fault`](crate::Vm::handle_fault), which decides what to install and
//! where. This module holds the architecture-independent view of a TLB slot, the trait
//! through which slots are read and written, and the round-robin eviction policy.

use core::fmt;
use core::ops::BitOr;

use crate::{PhysicalAddress, VirtualAddress, arch};

/// Flags carried by the low half of a TLB entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TlbFlags(u8);

impl TlbFlags {
    /// The entry translates its page.
    pub const VALID: Self = Self(1 << 0);

    /// Writes through the entry are permitted. Without it a store raises a modify fault.
    pub const DIRTY: Self = Self(1 << 1);

    /// The entry matches regardless of address space identifier.
    pub const GLOBAL: Self = Self(1 << 2);

    /// Accesses through the entry bypass the cache.
    pub const NOCACHE: Self = Self(1 << 3);

    /// Creates an empty flag set (entry not valid).
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates flags from their raw bit representation.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw bits of these flags.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns whether every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns whether the valid bit is set.
    pub const fn is_valid(self) -> bool {
        self.contains(Self::VALID)
    }

    /// Returns whether the dirty (writable) bit is set.
    pub const fn is_dirty(self) -> bool {
        self.contains(Self::DIRTY)
    }
}

impl BitOr for TlbFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for TlbFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::VALID, "V"),
            (Self::DIRTY, "D"),
            (Self::GLOBAL, "G"),
            (Self::NOCACHE, "N"),
        ];
        write!(f, "TlbFlags(")?;
        for (flag, name) in names {
            if self.contains(flag) {
                write!(f, "{name}")?;
            }
        }
        write!(f, ")")
    }
}

/// A single TLB slot: a virtual page, the frame it maps to, and its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlbEntry {
    page: VirtualAddress,
    frame: PhysicalAddress,
    flags: TlbFlags,
}

impl TlbEntry {
    /// Creates an entry mapping `page` to `frame`.
    ///
    /// # Panics
    ///
    /// Panics if either address is not page-aligned.
    pub fn new(page: VirtualAddress, frame: PhysicalAddress, flags: TlbFlags) -> Self {
        assert!(
            page.is_aligned(arch::PAGE_SIZE),
            "TLB page must be page-aligned"
        );
        assert!(
            frame.is_aligned(arch::PAGE_SIZE),
            "TLB frame must be page-aligned"
        );
        Self { page, frame, flags }
    }

    /// Returns the canonical invalid entry for `slot`.
    ///
    /// Each slot gets its own kernel direct-map page so that no two slots ever hold the
    /// same virtual page, even while invalid. User faults never reach the direct map.
    pub fn invalid(slot: usize) -> Self {
        assert!(slot < arch::NUM_TLB, "TLB slot out of range");
        Self {
            page: VirtualAddress::new(arch::KSEG0 + slot * arch::PAGE_SIZE),
            frame: PhysicalAddress::new(0),
            flags: TlbFlags::empty(),
        }
    }

    /// Returns the virtual page this entry translates.
    pub const fn page(&self) -> VirtualAddress {
        self.page
    }

    /// Returns the physical frame this entry maps to.
    pub const fn frame(&self) -> PhysicalAddress {
        self.frame
    }

    /// Returns the flags of this entry.
    pub const fn flags(&self) -> TlbFlags {
        self.flags
    }

    /// Returns whether this entry currently translates its page.
    pub const fn is_valid(&self) -> bool {
        self.flags.is_valid()
    }

    /// Returns whether stores through this entry are permitted.
    pub const fn is_dirty(&self) -> bool {
        self.flags.is_dirty()
    }
}

/// Access to the TLB of the executing core.
///
/// Implementations must not mask or unmask interrupts themselves; callers that need a
/// read-modify-write sequence to be atomic hold an
/// [`InterruptGuard`](crate::InterruptGuard) around it.
pub trait Tlb {
    /// Reads the entry in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= NUM_TLB`.
    fn read(&self, slot: usize) -> TlbEntry;

    /// Overwrites the entry in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= NUM_TLB`.
    fn write(&mut self, slot: usize, entry: TlbEntry);

    /// Returns the slot holding a valid translation for `page`, if any.
    ///
    /// Reads every slot in turn, so the caller must hold an
    /// [`InterruptGuard`](crate::InterruptGuard) for the whole scan.
    fn probe(&self, page: VirtualAddress) -> Option<usize> {
        (0..arch::NUM_TLB).find(|&slot| {
            let entry = self.read(slot);
            entry.is_valid() && entry.page() == page
        })
    }
}

/// Round-robin choice of the slot to evict once every TLB slot is valid.
///
/// Successive calls walk `0, 1, ..., NUM_TLB - 1` and wrap around. The sequence restarts
/// from zero after [`reset`](Self::reset), which the context-switch path calls whenever the
/// TLB is flushed for a new address space.
#[derive(Debug, Default)]
pub struct VictimSelector {
    next: usize,
}

impl VictimSelector {
    /// Creates a selector that will evict slot 0 first.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Returns the slot to evict and advances to the next one.
    pub fn next_victim(&mut self) -> usize {
        let victim = self.next;
        self.next = (self.next + 1) % arch::NUM_TLB;
        victim
    }

    /// Returns the slot the next call to [`next_victim`](Self::next_victim) will return.
    pub const fn peek(&self) -> usize {
        self.next
    }

    /// Restarts the sequence at slot 0.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}
