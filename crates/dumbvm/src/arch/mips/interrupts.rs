//! Interrupt masking through the cp0 status register.

use core::arch::asm;

use crate::InterruptControl;

/// Current interrupt enable bit of the status register.
const CST_IEC: u32 = 0x0000_0001;

/// Interrupt control for the executing R3000 core.
pub struct StatusInterrupts;

fn read_status() -> u32 {
    let status: u32;
    // SAFETY: reading the status register has no side effects.
    unsafe {
        asm!("mfc0 {0}, $12", out(reg) status, options(nomem, nostack));
    }
    status
}

fn write_status(status: u32) {
    // SAFETY: only the interrupt enable bit differs from the value just read.
    unsafe {
        asm!("mtc0 {0}, $12", "nop", in(reg) status, options(nostack));
    }
}

impl InterruptControl for StatusInterrupts {
    fn disable(&self) -> bool {
        let status = read_status();
        write_status(status & !CST_IEC);
        status & CST_IEC != 0
    }

    fn restore(&self, were_enabled: bool) {
        if were_enabled {
            write_status(read_status() | CST_IEC);
        }
    }
}
