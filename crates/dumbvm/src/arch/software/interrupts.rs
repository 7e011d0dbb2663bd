//! Emulated interrupt state for software emulation.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::InterruptControl;

/// Emulated interrupt-enable flag of a single core.
///
/// Tests use it to observe that TLB updates happen with interrupts masked and that the
/// previous state comes back afterwards.
pub struct EmulatedInterrupts {
    enabled: AtomicBool,
    /// Number of times interrupts went from enabled to masked.
    masked: AtomicUsize,
}

impl EmulatedInterrupts {
    /// Creates a core with interrupts enabled.
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            masked: AtomicUsize::new(0),
        }
    }

    /// Returns whether interrupts are currently enabled.
    pub fn are_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns how many critical sections have masked interrupts so far.
    pub fn masked_sections(&self) -> usize {
        self.masked.load(Ordering::Acquire)
    }
}

impl Default for EmulatedInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptControl for EmulatedInterrupts {
    fn disable(&self) -> bool {
        let were_enabled = self.enabled.swap(false, Ordering::AcqRel);
        if were_enabled {
            self.masked.fetch_add(1, Ordering::AcqRel);
        }
        were_enabled
    }

    fn restore(&self, were_enabled: bool) {
        self.enabled.store(were_enabled, Ordering::Release);
    }
}
