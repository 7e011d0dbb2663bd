//! Fault statistics.
//!
//! Purely observational: nothing on the fault path reads these counters back.

use core::fmt;

/// A counted VM event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmStat {
    /// A TLB miss reached the fault handler and was installed.
    TlbFault,
    /// The miss was installed into a slot that was already invalid.
    TlbFaultFree,
    /// The miss was installed by evicting a valid slot.
    TlbFaultReplace,
    /// The whole TLB was invalidated for an address-space switch.
    TlbInvalidate,
}

impl VmStat {
    /// Every statistic, in reporting order.
    pub const ALL: [VmStat; 4] = [
        VmStat::TlbFault,
        VmStat::TlbFaultFree,
        VmStat::TlbFaultReplace,
        VmStat::TlbInvalidate,
    ];

    /// Returns the name used when reporting this statistic.
    pub const fn name(self) -> &'static str {
        match self {
            VmStat::TlbFault => "TLB Faults",
            VmStat::TlbFaultFree => "TLB Faults with Free",
            VmStat::TlbFaultReplace => "TLB Faults with Replace",
            VmStat::TlbInvalidate => "TLB Invalidations",
        }
    }
}

impl fmt::Display for VmStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters for each [`VmStat`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VmStats {
    counts: [u64; VmStat::ALL.len()],
}

impl VmStats {
    /// Creates a set of zeroed counters.
    pub const fn new() -> Self {
        Self {
            counts: [0; VmStat::ALL.len()],
        }
    }

    /// Increments `stat` by one.
    pub fn inc(&mut self, stat: VmStat) {
        self.counts[stat as usize] += 1;
    }

    /// Returns the current value of `stat`.
    pub fn get(&self, stat: VmStat) -> u64 {
        self.counts[stat as usize]
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        self.counts = [0; VmStat::ALL.len()];
    }

    /// Returns whether every fault was resolved through exactly one of the two paths.
    pub fn is_consistent(&self) -> bool {
        self.get(VmStat::TlbFault)
            == self.get(VmStat::TlbFaultFree) + self.get(VmStat::TlbFaultReplace)
    }

    /// Logs every counter, warning if the fault counts do not add up.
    pub fn log_summary(&self) {
        log::info!("VM statistics:");
        for stat in VmStat::ALL {
            log::info!("  {:<24} = {:>8}", stat.name(), self.get(stat));
        }
        if !self.is_consistent() {
            log::warn!(
                "VM statistics: {} ({}) != {} ({}) + {} ({})",
                VmStat::TlbFault,
                self.get(VmStat::TlbFault),
                VmStat::TlbFaultFree,
                self.get(VmStat::TlbFaultFree),
                VmStat::TlbFaultReplace,
                self.get(VmStat::TlbFaultReplace),
            );
        }
    }
}
