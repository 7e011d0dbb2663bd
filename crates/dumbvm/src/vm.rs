//! The TLB fault handler.
//!
//! Every TLB miss on a user address ends up in [`Vm::handle_fault`]. The handler checks
//! that there is a user context to resolve the fault against, asks the
//! [`PageTableBridge`] for the frame backing the page, and installs the translation:
//! into the first invalid slot if there is one, otherwise over the slot picked by the
//! round-robin [`VictimSelector`].

use crate::{
    FaultError, FaultType, InterruptControl, InterruptGuard, PageTableBridge, PhysicalAddress,
    Process, Tlb, TlbEntry, TlbFlags, VictimSelector, VirtualAddress, VmStat, VmStats,
    arch::{NUM_TLB, PAGE_SIZE},
};

/// How a translation found its TLB slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installed {
    /// The slot was invalid.
    Free(usize),
    /// The slot held a valid entry, which was evicted.
    Replaced(usize),
}

impl Installed {
    /// Returns the slot the translation was written to.
    pub const fn slot(self) -> usize {
        match self {
            Installed::Free(slot) | Installed::Replaced(slot) => slot,
        }
    }
}

/// Per-core virtual memory state: the TLB, its interrupt control, the eviction cursor
/// and the fault statistics.
pub struct Vm<T, I> {
    tlb: T,
    interrupts: I,
    victims: VictimSelector,
    stats: VmStats,
}

impl<T: Tlb, I: InterruptControl> Vm<T, I> {
    /// Creates the VM state for a core.
    ///
    /// The TLB is assumed to have been invalidated already; call
    /// [`activate`](Self::activate) first if that is not the case.
    pub fn new(tlb: T, interrupts: I) -> Self {
        Self {
            tlb,
            interrupts,
            victims: VictimSelector::new(),
            stats: VmStats::new(),
        }
    }

    /// Resolves a TLB miss at `fault_address`.
    ///
    /// `fault_type` is the raw code from the trap dispatcher and `current` the process
    /// running on this core, if any. Errors returned by `bridge` are passed through
    /// unchanged.
    ///
    /// # Panics
    ///
    /// Panics on a read-only fault (every mapping is created writable, so one cannot
    /// happen), on an address space that is not fully set up, and on an unaligned frame
    /// from `bridge`. These are kernel bugs with no user-space recovery.
    pub fn handle_fault<B: PageTableBridge + ?Sized>(
        &mut self,
        fault_type: u32,
        fault_address: VirtualAddress,
        current: Option<&mut Process>,
        bridge: &B,
    ) -> Result<(), FaultError> {
        let page = fault_address.align_down(PAGE_SIZE);
        log::debug!("dumbvm: fault: {page}");

        match FaultType::try_from(fault_type)? {
            FaultType::ReadOnly => panic!("dumbvm: got VM_FAULT_READONLY"),
            FaultType::Read | FaultType::Write => {}
        }

        // No process or no address space means a kernel fault early in boot. Report it
        // rather than faulting again forever.
        let Some(process) = current else {
            return Err(FaultError::FaultFatal);
        };
        let Some(space) = process.address_space_mut() else {
            return Err(FaultError::FaultFatal);
        };
        space.assert_valid();

        let frame = bridge.lookup_or_fault(page, space)?;
        assert!(
            frame.is_aligned(PAGE_SIZE),
            "dumbvm: unaligned frame {frame} for {page}"
        );

        self.install(page, frame);
        Ok(())
    }

    /// Writes `page -> frame` into the TLB with interrupts masked.
    ///
    /// Every entry is installed valid and dirty.
    pub fn install(&mut self, page: VirtualAddress, frame: PhysicalAddress) -> Installed {
        let entry = TlbEntry::new(page, frame, TlbFlags::VALID | TlbFlags::DIRTY);

        let _guard = InterruptGuard::new(&self.interrupts);
        self.stats.inc(VmStat::TlbFault);

        let installed = match (0..NUM_TLB).find(|&slot| !self.tlb.read(slot).is_valid()) {
            Some(slot) => {
                self.stats.inc(VmStat::TlbFaultFree);
                Installed::Free(slot)
            }
            None => {
                self.stats.inc(VmStat::TlbFaultReplace);
                Installed::Replaced(self.victims.next_victim())
            }
        };

        log::debug!("dumbvm: {page} -> {frame}");
        self.tlb.write(installed.slot(), entry);
        installed
    }

    /// Flushes the TLB for a new address space.
    ///
    /// Every slot is invalidated and the eviction sequence restarts at slot 0.
    pub fn activate(&mut self) {
        let _guard = InterruptGuard::new(&self.interrupts);
        for slot in 0..NUM_TLB {
            self.tlb.write(slot, TlbEntry::invalid(slot));
        }
        self.victims.reset();
        self.stats.inc(VmStat::TlbInvalidate);
    }

    /// Restarts the eviction sequence at slot 0.
    ///
    /// The context-switch path must call this (or [`activate`](Self::activate)) whenever
    /// the TLB contents go stale, before the next fault is handled.
    pub fn reset_victim_selector(&mut self) {
        self.victims.reset();
    }

    /// Returns the slot the next eviction will use.
    pub fn next_victim(&self) -> usize {
        self.victims.peek()
    }

    /// Returns the TLB of this core.
    pub fn tlb(&self) -> &T {
        &self.tlb
    }

    /// Returns the interrupt control of this core.
    pub fn interrupts(&self) -> &I {
        &self.interrupts
    }

    /// Returns the fault statistics gathered so far.
    pub fn stats(&self) -> &VmStats {
        &self.stats
    }
}
