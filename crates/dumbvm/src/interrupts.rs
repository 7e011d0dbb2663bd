//! Interrupt masking for TLB critical sections.
//!
//! Installing a translation is a scan-then-write sequence over shared hardware state. It
//! must not be interleaved with another fault or a timer interrupt on the same core, so
//! the whole sequence runs with interrupts masked. Cross-core consistency is not provided.

/// Interrupt enable/disable for the executing core.
pub trait InterruptControl {
    /// Masks interrupts on the current core.
    ///
    /// Returns whether interrupts were enabled before the call, to be handed back to
    /// [`restore`](Self::restore).
    fn disable(&self) -> bool;

    /// Restores the interrupt state returned by a matching [`disable`](Self::disable).
    fn restore(&self, were_enabled: bool);
}

/// Keeps interrupts masked on the current core for as long as it lives.
///
/// The previous state is restored on drop, which covers early returns and unwinding out
/// of a failed assertion alike.
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct InterruptGuard<'a, I: InterruptControl + ?Sized> {
    control: &'a I,
    were_enabled: bool,
}

impl<'a, I: InterruptControl + ?Sized> InterruptGuard<'a, I> {
    /// Masks interrupts through `control` until the guard is dropped.
    pub fn new(control: &'a I) -> Self {
        let were_enabled = control.disable();
        Self {
            control,
            were_enabled,
        }
    }
}

impl<I: InterruptControl + ?Sized> Drop for InterruptGuard<'_, I> {
    fn drop(&mut self) {
        self.control.restore(self.were_enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::EmulatedInterrupts;

    #[test]
    fn masks_while_held() {
        let interrupts = EmulatedInterrupts::new();
        {
            let _guard = InterruptGuard::new(&interrupts);
            assert!(!interrupts.are_enabled());
        }
        assert!(interrupts.are_enabled());
    }

    #[test]
    fn nested_guards_restore_outer_state() {
        let interrupts = EmulatedInterrupts::new();
        let outer = InterruptGuard::new(&interrupts);
        {
            let _inner = InterruptGuard::new(&interrupts);
            assert!(!interrupts.are_enabled());
        }
        // The inner guard found interrupts already masked and leaves them that way.
        assert!(!interrupts.are_enabled());
        drop(outer);
        assert!(interrupts.are_enabled());
    }

    #[test]
    fn restores_when_unwinding() {
        let interrupts = EmulatedInterrupts::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = InterruptGuard::new(&interrupts);
            panic!("fault inside critical section");
        }));

        assert!(result.is_err());
        assert!(interrupts.are_enabled());
    }
}
