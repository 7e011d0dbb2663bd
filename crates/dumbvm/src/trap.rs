//! Exception dispatch into the VM layer.
//!
//! The low-level exception vector saves a [`TrapFrame`] and hands it to
//! [`dispatch_vm_trap`]. TLB exceptions are turned into a fault type and resolved by
//! [`Vm::handle_fault`]; everything else is left to the caller.

use core::fmt;

use crate::{
    FaultType, InterruptControl, PageTableBridge, Process, Tlb, VirtualAddress, Vm,
    errno::SIGSEGV,
};

/// Defines [`ExceptionCode`] from `NAME = value` pairs. Codes the VM layer resolves carry
/// `=> Variant`, the [`FaultType`] they raise.
macro_rules! exception_codes {
    (@fault $fault:ident) => {
        Some(FaultType::$fault)
    };
    (@fault) => {
        None
    };
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $value:literal $(=> $fault:ident)?,
        )*
    ) => {
        /// The `ExcCode` field of the CP0 Cause register.
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct ExceptionCode(u32);

        impl ExceptionCode {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($value);
            )*

            /// Creates an exception code from a raw Cause register field.
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Returns the name of the exception code, if known.
            pub const fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($name)),)*
                    _ => None,
                }
            }

            /// Returns the fault type for a TLB exception, or `None` for any other exception.
            pub const fn fault_type(self) -> Option<FaultType> {
                match self.0 {
                    $($value => exception_codes!(@fault $($fault)?),)*
                    _ => None,
                }
            }
        }
    };
}

exception_codes! {
    /// External or timer interrupt.
    INTERRUPT = 0,
    /// Store through a TLB entry without the dirty bit.
    TLB_MODIFY = 1 => ReadOnly,
    /// TLB miss on a load or instruction fetch.
    TLB_LOAD = 2 => Read,
    /// TLB miss on a store.
    TLB_STORE = 3 => Write,
    /// Unaligned load, or a user load from kernel space.
    ADDRESS_ERROR_LOAD = 4,
    /// Unaligned store, or a user store to kernel space.
    ADDRESS_ERROR_STORE = 5,
    /// Bus error on instruction fetch.
    IBUS_ERROR = 6,
    /// Bus error on data access.
    DBUS_ERROR = 7,
    /// `syscall` instruction.
    SYSCALL = 8,
    /// `break` instruction.
    BREAKPOINT = 9,
    /// Reserved instruction.
    RESERVED_INSTRUCTION = 10,
    /// Coprocessor unusable.
    COPROCESSOR_UNUSABLE = 11,
    /// Arithmetic overflow.
    OVERFLOW = 12,
}

impl fmt::Debug for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "ExceptionCode::{name}({})", self.0),
            None => write!(f, "ExceptionCode({})", self.0),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// The parts of the saved register state the VM layer looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    /// Cause of the exception.
    pub code: ExceptionCode,
    /// Contents of CP0 BadVAddr.
    pub bad_vaddr: VirtualAddress,
    /// Whether the exception was taken from user mode.
    pub user_mode: bool,
}

/// What the exception handler should do after [`dispatch_vm_trap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// The translation is installed; return and retry the instruction.
    Resolved,
    /// The fault could not be resolved; kill the current process with `signal`.
    KillProcess { signal: i32 },
    /// Not a TLB exception.
    NotHandled,
}

/// Routes a TLB exception to the fault handler.
///
/// # Panics
///
/// Panics if a fault taken in kernel mode cannot be resolved.
pub fn dispatch_vm_trap<T, I, B>(
    vm: &mut Vm<T, I>,
    frame: &TrapFrame,
    current: Option<&mut Process>,
    bridge: &B,
) -> TrapOutcome
where
    T: Tlb,
    I: InterruptControl,
    B: PageTableBridge + ?Sized,
{
    let Some(fault_type) = frame.code.fault_type() else {
        return TrapOutcome::NotHandled;
    };

    match vm.handle_fault(fault_type as u32, frame.bad_vaddr, current, bridge) {
        Ok(()) => TrapOutcome::Resolved,
        Err(error) if frame.user_mode => {
            log::warn!(
                "dumbvm: {} at {}: {error} (errno {})",
                frame.code,
                frame.bad_vaddr,
                error.errno()
            );
            TrapOutcome::KillProcess { signal: SIGSEGV }
        }
        Err(error) => panic!(
            "fatal fault in kernel mode: {} at {}: {error}",
            frame.code, frame.bad_vaddr
        ),
    }
}
