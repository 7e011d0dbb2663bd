//! Emulated TLB for software emulation.

use crate::{Tlb, TlbEntry, arch::NUM_TLB};

/// An in-memory TLB with [`NUM_TLB`] slots.
///
/// Every slot starts out holding its canonical invalid entry, as the hardware TLB does
/// after boot-time invalidation.
pub struct EmulatedTlb {
    entries: [TlbEntry; NUM_TLB],
    /// Number of slot writes performed so far.
    writes: usize,
}

impl EmulatedTlb {
    /// Creates a TLB with every slot invalid.
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(TlbEntry::invalid),
            writes: 0,
        }
    }

    /// Returns all slots in index order.
    pub fn entries(&self) -> &[TlbEntry; NUM_TLB] {
        &self.entries
    }

    /// Returns the number of slot writes performed so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Default for EmulatedTlb {
    fn default() -> Self {
        Self::new()
    }
}

impl Tlb for EmulatedTlb {
    fn read(&self, slot: usize) -> TlbEntry {
        assert!(slot < NUM_TLB, "TLB slot out of range");
        self.entries[slot]
    }

    fn write(&mut self, slot: usize, entry: TlbEntry) {
        assert!(slot < NUM_TLB, "TLB slot out of range");
        self.entries[slot] = entry;
        self.writes += 1;
    }
}
