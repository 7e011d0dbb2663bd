//! Coprocessor 0 access to the R3000 TLB.

use core::arch::asm;

use crate::{PhysicalAddress, Tlb, TlbEntry, TlbFlags, VirtualAddress, arch::NUM_TLB};

const TLBHI_VPAGE: u32 = 0xFFFF_F000;
const TLBLO_PPAGE: u32 = 0xFFFF_F000;
const TLBLO_NOCACHE: u32 = 0x0000_0800;
const TLBLO_DIRTY: u32 = 0x0000_0400;
const TLBLO_VALID: u32 = 0x0000_0200;
const TLBLO_GLOBAL: u32 = 0x0000_0100;

/// Bit position of the slot number in the cp0 Index register.
const INDEX_SHIFT: u32 = 8;

/// The TLB of the executing R3000 core.
pub struct R3000Tlb {
    _private: (),
}

impl R3000Tlb {
    /// Claims the TLB of the current core.
    ///
    /// # Safety
    ///
    /// There must be exactly one `R3000Tlb` per core, and the caller must be running
    /// in kernel mode.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

fn encode(entry: TlbEntry) -> (u32, u32) {
    let hi = entry.page().as_usize() as u32 & TLBHI_VPAGE;
    let flags = entry.flags();
    let mut lo = entry.frame().as_usize() as u32 & TLBLO_PPAGE;
    for (flag, bit) in [
        (TlbFlags::VALID, TLBLO_VALID),
        (TlbFlags::DIRTY, TLBLO_DIRTY),
        (TlbFlags::GLOBAL, TLBLO_GLOBAL),
        (TlbFlags::NOCACHE, TLBLO_NOCACHE),
    ] {
        if flags.contains(flag) {
            lo |= bit;
        }
    }
    (hi, lo)
}

fn decode(hi: u32, lo: u32) -> TlbEntry {
    let mut flags = TlbFlags::empty();
    for (flag, bit) in [
        (TlbFlags::VALID, TLBLO_VALID),
        (TlbFlags::DIRTY, TLBLO_DIRTY),
        (TlbFlags::GLOBAL, TLBLO_GLOBAL),
        (TlbFlags::NOCACHE, TLBLO_NOCACHE),
    ] {
        if lo & bit != 0 {
            flags = flags | flag;
        }
    }
    TlbEntry::new(
        VirtualAddress::new((hi & TLBHI_VPAGE) as usize),
        PhysicalAddress::new((lo & TLBLO_PPAGE) as usize),
        flags,
    )
}

impl Tlb for R3000Tlb {
    fn read(&self, slot: usize) -> TlbEntry {
        assert!(slot < NUM_TLB, "TLB slot out of range");
        let hi: u32;
        let lo: u32;
        // SAFETY: Index, EntryHi and EntryLo are scratch registers for TLB access; the
        // caller holds interrupts masked so nothing else touches them in between.
        unsafe {
            asm!(
                "mtc0 {index}, $0",
                "nop",
                "tlbr",
                "nop",
                "mfc0 {hi}, $10",
                "mfc0 {lo}, $2",
                index = in(reg) (slot as u32) << INDEX_SHIFT,
                hi = out(reg) hi,
                lo = out(reg) lo,
                options(nostack),
            );
        }
        decode(hi, lo)
    }

    fn write(&mut self, slot: usize, entry: TlbEntry) {
        assert!(slot < NUM_TLB, "TLB slot out of range");
        let (hi, lo) = encode(entry);
        // SAFETY: see `read`; `tlbwi` only replaces the indexed slot.
        unsafe {
            asm!(
                "mtc0 {hi}, $10",
                "mtc0 {lo}, $2",
                "mtc0 {index}, $0",
                "nop",
                "tlbwi",
                "nop",
                hi = in(reg) hi,
                lo = in(reg) lo,
                index = in(reg) (slot as u32) << INDEX_SHIFT,
                options(nostack),
            );
        }
    }
}
