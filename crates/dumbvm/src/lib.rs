#![cfg_attr(not(any(test, feature = "software-emulation")), no_std)]
#![cfg_attr(target_arch = "mips", feature(asm_experimental_arch))]

//! # dumbvm
//!
//! A minimal virtual memory system for a MIPS R3000 teaching kernel. It provides:
//!
//! - A bump allocator for physical frames that never reclaims memory.
//! - Per-process address spaces with a code segment, a data segment and a fixed stack.
//! - A TLB fault handler that installs translations into the software-managed TLB,
//!   evicting entries round-robin once it is full.
//! - Software emulation of the TLB and interrupt state for testing in non-kernel
//!   environments.

extern crate alloc;

mod address;
mod address_space;
pub mod arch;
pub mod errno;
mod fault;
mod frame_allocator;
mod interrupts;
mod page_table;
mod pager;
mod process;
mod stats;
mod tlb;
mod trap;
mod vm;

pub use address::{PhysicalAddress, VirtualAddress};
pub use address_space::{AddressSpace, AddressSpaceError, Region};
pub use fault::{FaultError, FaultType};
pub use frame_allocator::{FrameAllocator, free_kpages};
pub use interrupts::{InterruptControl, InterruptGuard};
pub use page_table::{PageEntry, PageFlags, PageTable};
pub use pager::{PageTableBridge, PageTableWalker};
pub use process::Process;
pub use stats::{VmStat, VmStats};
pub use tlb::{Tlb, TlbEntry, TlbFlags, VictimSelector};
pub use trap::{ExceptionCode, TrapFrame, TrapOutcome, dispatch_vm_trap};
pub use vm::{Installed, Vm};

pub use arch::{KSEG0, NUM_TLB, PAGE_SIZE, STACK_PAGES, USER_STACK};
