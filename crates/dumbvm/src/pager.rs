//! Translation of faulting pages into frames.

use crate::{AddressSpace, FaultError, PhysicalAddress, VirtualAddress, arch};

/// The single authority that turns a user page into the frame backing it.
///
/// The fault handler does not care whether an implementation walks a table, consults a
/// flat map or allocates on demand. It relies on three things: the page passed in is
/// page-aligned, a returned frame is page-aligned, and a page outside every mapped region
/// yields [`FaultError::SegmentationFault`].
pub trait PageTableBridge {
    /// Returns the frame backing `page` in `space`, mapping one if needed.
    fn lookup_or_fault(
        &self,
        page: VirtualAddress,
        space: &mut AddressSpace,
    ) -> Result<PhysicalAddress, FaultError>;
}

/// Looks faulting pages up in the address space's page table.
///
/// Every segment and stack page is mapped by
/// [`prepare_load`](AddressSpace::prepare_load), so a page missing from the table is
/// outside the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageTableWalker;

impl PageTableBridge for PageTableWalker {
    fn lookup_or_fault(
        &self,
        page: VirtualAddress,
        space: &mut AddressSpace,
    ) -> Result<PhysicalAddress, FaultError> {
        debug_assert!(page.is_aligned(arch::PAGE_SIZE));

        if !space.contains(page) {
            return Err(FaultError::SegmentationFault);
        }
        space
            .page_table()
            .translate(page)
            .ok_or(FaultError::SegmentationFault)
    }
}
