//! Address space management.
//!
//! An address space describes what a user process may touch: a code segment, a data
//! segment and a fixed-size stack directly below [`USER_STACK`]. It also owns the page
//! table that records which frame backs each of those pages.
//!
//! Every page is backed when the program is loaded: [`AddressSpace::prepare_load`] takes
//! one contiguous run of frames per segment and one for the stack, and maps them all.
//! Nothing is paged in later.
//!
//! There is no read-only mapping class. Every page is installed writable, so a store to
//! the code segment succeeds; segment protection is not enforced.

use thiserror::Error;

use crate::{
    FrameAllocator, PageFlags, PageTable, PhysicalAddress, VirtualAddress,
    arch::{PAGE_SIZE, STACK_PAGES, USER_STACK},
};

/// Errors raised while building an address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddressSpaceError {
    /// Both the code and data segments are already defined.
    #[error("too many regions")]
    TooManyRegions,
    /// Physical memory ran out while backing a segment or the stack.
    #[error("out of memory")]
    OutOfMemory,
    /// The region runs into the stack, the kernel or past the end of the address space.
    #[error("region out of range")]
    OutOfRange,
}

impl AddressSpaceError {
    /// Returns the errno value reported to user space.
    pub const fn errno(self) -> i32 {
        match self {
            Self::TooManyRegions => crate::errno::EUNIMP,
            Self::OutOfMemory => crate::errno::ENOMEM,
            Self::OutOfRange => crate::errno::EFAULT,
        }
    }
}

/// A contiguous, page-aligned range of user pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    base: VirtualAddress,
    pages: usize,
}

impl Region {
    /// Creates a region of `pages` pages starting at `base`.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not page-aligned.
    pub const fn new(base: VirtualAddress, pages: usize) -> Self {
        assert!(base.is_aligned(PAGE_SIZE), "region base must be page-aligned");
        Self { base, pages }
    }

    /// Returns the first address of the region.
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    /// Returns the number of pages in the region.
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Returns the first address past the region.
    pub const fn end(&self) -> usize {
        self.base.as_usize() + self.pages * PAGE_SIZE
    }

    /// Returns whether `addr` falls inside the region.
    pub const fn contains(&self, addr: VirtualAddress) -> bool {
        addr.as_usize() >= self.base.as_usize() && addr.as_usize() < self.end()
    }
}

/// The user address space of one process.
pub struct AddressSpace {
    code: Option<Region>,
    data: Option<Region>,
    /// Physical base of the contiguous code frames.
    code_base: Option<PhysicalAddress>,
    /// Physical base of the contiguous data frames.
    data_base: Option<PhysicalAddress>,
    /// Physical base of the contiguous stack frames.
    stack_base: Option<PhysicalAddress>,
    page_table: PageTable,
}

impl AddressSpace {
    /// Creates an empty address space with no segments and no stack.
    pub fn new() -> Self {
        Self {
            code: None,
            data: None,
            code_base: None,
            data_base: None,
            stack_base: None,
            page_table: PageTable::new(),
        }
    }

    /// Defines a segment covering `[vaddr, vaddr + size)`, widened to whole pages.
    ///
    /// The first call defines the code segment, the second the data segment. A region
    /// must end at or below the bottom of the stack.
    pub fn define_region(
        &mut self,
        vaddr: VirtualAddress,
        size: usize,
    ) -> Result<(), AddressSpaceError> {
        if self.code.is_some() && self.data.is_some() {
            log::warn!("dumbvm: too many regions, ignoring {vaddr}");
            return Err(AddressSpaceError::TooManyRegions);
        }

        let base = vaddr.align_down(PAGE_SIZE);
        let pages = size
            .checked_add(vaddr.page_offset())
            .ok_or(AddressSpaceError::OutOfRange)?
            .div_ceil(PAGE_SIZE);
        let end = pages
            .checked_mul(PAGE_SIZE)
            .and_then(|len| len.checked_add(base.as_usize()))
            .ok_or(AddressSpaceError::OutOfRange)?;
        if end > Self::stack_region().base().as_usize() {
            log::warn!("dumbvm: region {base} (+{pages} pages) overlaps the stack");
            return Err(AddressSpaceError::OutOfRange);
        }
        let region = Region::new(base, pages);

        if self.code.is_none() {
            self.code = Some(region);
        } else {
            self.data = Some(region);
        }
        Ok(())
    }

    /// Allocates and maps the frames backing every defined segment and the stack.
    ///
    /// Each segment gets one contiguous run of frames, as does the stack. Nothing is
    /// mapped if any allocation fails.
    ///
    /// # Panics
    ///
    /// Panics if the address space was already prepared.
    pub fn prepare_load(&mut self, frames: &FrameAllocator) -> Result<(), AddressSpaceError> {
        assert!(self.stack_base.is_none(), "address space already prepared");

        let allocate = |pages: usize| {
            frames
                .try_allocate_frames(pages)
                .ok_or(AddressSpaceError::OutOfMemory)
        };
        let code_base = self.code.map(|code| allocate(code.pages())).transpose()?;
        let data_base = self.data.map(|data| allocate(data.pages())).transpose()?;
        let stack_base = allocate(STACK_PAGES)?;

        let backed = [
            self.code.zip(code_base),
            self.data.zip(data_base),
            Some((Self::stack_region(), stack_base)),
        ];
        for (region, base) in backed.into_iter().flatten() {
            self.map_region(region, base);
        }

        self.code_base = code_base;
        self.data_base = data_base;
        self.stack_base = Some(stack_base);
        Ok(())
    }

    fn map_region(&mut self, region: Region, base: PhysicalAddress) {
        for index in 0..region.pages() {
            self.page_table.map(
                region.base() + index * PAGE_SIZE,
                base + index * PAGE_SIZE,
                PageFlags::writable(),
            );
        }
        log::trace!(
            "dumbvm: mapped {} (+{} pages) at {base}",
            region.base(),
            region.pages()
        );
    }

    /// Returns the initial user stack pointer.
    ///
    /// # Panics
    ///
    /// Panics if [`prepare_load`](Self::prepare_load) has not run.
    pub fn define_stack(&self) -> VirtualAddress {
        assert!(self.stack_base.is_some(), "stack not prepared");
        VirtualAddress::new(USER_STACK)
    }

    /// Returns the range of user pages reserved for the stack.
    pub const fn stack_region() -> Region {
        Region::new(
            VirtualAddress::new(USER_STACK - STACK_PAGES * PAGE_SIZE),
            STACK_PAGES,
        )
    }

    /// Returns the code segment, if defined.
    pub fn code(&self) -> Option<Region> {
        self.code
    }

    /// Returns the data segment, if defined.
    pub fn data(&self) -> Option<Region> {
        self.data
    }

    /// Returns the physical base of the code frames, if prepared.
    pub fn code_base(&self) -> Option<PhysicalAddress> {
        self.code_base
    }

    /// Returns the physical base of the data frames, if prepared.
    pub fn data_base(&self) -> Option<PhysicalAddress> {
        self.data_base
    }

    /// Returns the physical base of the stack, if prepared.
    pub fn stack_base(&self) -> Option<PhysicalAddress> {
        self.stack_base
    }

    /// Returns whether `addr` lies in the code segment, the data segment or the stack.
    pub fn contains(&self, addr: VirtualAddress) -> bool {
        self.code.is_some_and(|region| region.contains(addr))
            || self.data.is_some_and(|region| region.contains(addr))
            || (self.stack_base.is_some() && Self::stack_region().contains(addr))
    }

    /// Checks that the address space is fully set up.
    ///
    /// A fault against a half-built address space is a kernel bug, not a user error.
    ///
    /// # Panics
    ///
    /// Panics if a segment or the stack is missing, empty, at zero, unaligned or not backed
    /// by frames.
    pub fn assert_valid(&self) {
        let Some(code) = self.code else {
            panic!("dumbvm: address space has no code segment");
        };
        let Some(data) = self.data else {
            panic!("dumbvm: address space has no data segment");
        };
        let Some(stack_base) = self.stack_base else {
            panic!("dumbvm: address space has no stack");
        };

        for (name, region, base) in [
            ("code", code, self.code_base),
            ("data", data, self.data_base),
        ] {
            assert!(
                !region.base().is_null() && region.pages() != 0,
                "dumbvm: empty {name} segment"
            );
            assert!(
                region.base().is_aligned(PAGE_SIZE),
                "dumbvm: unaligned {name} segment"
            );
            assert!(
                base.is_some_and(|base| !base.is_null() && base.is_aligned(PAGE_SIZE)),
                "dumbvm: {name} segment is not backed"
            );
        }
        assert!(
            !stack_base.is_null() && stack_base.is_aligned(PAGE_SIZE),
            "dumbvm: bad stack base {stack_base}"
        );
    }

    /// Returns the page table for this address space.
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// Returns a mutable reference to the page table for this address space.
    pub fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> FrameAllocator {
        FrameAllocator::new(
            PhysicalAddress::new(0x1000),
            PhysicalAddress::new(0x2000),
        )
    }

    #[test]
    fn define_region_widens_to_pages() {
        let mut space = AddressSpace::new();
        space
            .define_region(VirtualAddress::new(0x0104), PAGE_SIZE)
            .expect("first region");

        let code = space.code().expect("code segment");
        assert_eq!(code.base(), VirtualAddress::new(0x0100));
        assert_eq!(code.pages(), 2);
    }

    #[test]
    fn third_region_is_rejected() {
        let mut space = AddressSpace::new();
        space.define_region(VirtualAddress::new(0x0100), 32).unwrap();
        space.define_region(VirtualAddress::new(0x0400), 32).unwrap();

        let err = space
            .define_region(VirtualAddress::new(0x0800), 32)
            .unwrap_err();
        assert_eq!(err, AddressSpaceError::TooManyRegions);
        assert_eq!(err.errno(), crate::errno::EUNIMP);
    }

    #[test]
    fn region_into_stack_is_rejected() {
        let mut space = AddressSpace::new();
        let stack = AddressSpace::stack_region();

        let err = space
            .define_region(stack.base() - PAGE_SIZE, 2 * PAGE_SIZE)
            .unwrap_err();
        assert_eq!(err, AddressSpaceError::OutOfRange);
        assert_eq!(err.errno(), crate::errno::EFAULT);
        assert_eq!(
            space.define_region(VirtualAddress::new(USER_STACK - PAGE_SIZE), 4 * PAGE_SIZE),
            Err(AddressSpaceError::OutOfRange)
        );
        assert_eq!(space.code(), None);

        // Ending exactly at the stack is fine.
        space
            .define_region(stack.base() - PAGE_SIZE, PAGE_SIZE)
            .unwrap();
    }

    #[test]
    fn wrapping_region_is_rejected_without_taking_frames() {
        let frames = frames();
        let remaining = frames.remaining();
        let mut space = AddressSpace::new();

        assert_eq!(
            space.define_region(VirtualAddress::new(0x0100), usize::MAX),
            Err(AddressSpaceError::OutOfRange)
        );
        assert_eq!(
            space.define_region(VirtualAddress::new(0x0104), usize::MAX - 2),
            Err(AddressSpaceError::OutOfRange)
        );
        assert_eq!(
            space.define_region(VirtualAddress::new(0xFFF0), 2 * PAGE_SIZE),
            Err(AddressSpaceError::OutOfRange)
        );

        space.prepare_load(&frames).unwrap();
        assert_eq!(remaining - frames.remaining(), STACK_PAGES * PAGE_SIZE);
        assert_eq!(space.page_table().mapped_pages(), STACK_PAGES);
    }

    #[test]
    fn prepare_load_maps_stack() {
        let frames = frames();
        let mut space = AddressSpace::new();
        space.prepare_load(&frames).unwrap();

        let stack_base = space.stack_base().expect("stack prepared");
        let stack = AddressSpace::stack_region();
        assert_eq!(space.page_table().mapped_pages(), STACK_PAGES);
        assert_eq!(space.page_table().translate(stack.base()), Some(stack_base));
        assert_eq!(
            space
                .page_table()
                .translate(VirtualAddress::new(USER_STACK - PAGE_SIZE)),
            Some(stack_base + (STACK_PAGES - 1) * PAGE_SIZE)
        );
        assert_eq!(space.define_stack(), VirtualAddress::new(USER_STACK));
    }

    #[test]
    fn prepare_load_backs_segments_contiguously() {
        let frames = frames();
        let mut space = AddressSpace::new();
        space.define_region(VirtualAddress::new(0x0100), 3 * PAGE_SIZE).unwrap();
        space.define_region(VirtualAddress::new(0x0400), 2 * PAGE_SIZE).unwrap();
        space.prepare_load(&frames).unwrap();

        let code_base = space.code_base().expect("code backed");
        let data_base = space.data_base().expect("data backed");
        assert_eq!(space.page_table().mapped_pages(), 3 + 2 + STACK_PAGES);
        for index in 0..3 {
            assert_eq!(
                space
                    .page_table()
                    .translate(VirtualAddress::new(0x0100 + index * PAGE_SIZE)),
                Some(code_base + index * PAGE_SIZE)
            );
        }
        assert_eq!(
            space
                .page_table()
                .translate(VirtualAddress::new(0x0410)),
            Some(data_base + PAGE_SIZE)
        );
        assert_eq!(space.page_table().translate(VirtualAddress::new(0x0420)), None);
    }

    #[test]
    fn failed_prepare_load_maps_nothing() {
        let frames = FrameAllocator::new(
            PhysicalAddress::new(PAGE_SIZE),
            PhysicalAddress::new(PAGE_SIZE * (STACK_PAGES + 2)),
        );
        let mut space = AddressSpace::new();
        space.define_region(VirtualAddress::new(0x0100), 2 * PAGE_SIZE).unwrap();
        space.define_region(VirtualAddress::new(0x0400), PAGE_SIZE).unwrap();

        assert_eq!(
            space.prepare_load(&frames),
            Err(AddressSpaceError::OutOfMemory)
        );
        assert_eq!(space.page_table().mapped_pages(), 0);
        assert_eq!(space.code_base(), None);
    }

    #[test]
    fn prepare_load_reports_exhaustion() {
        let frames = FrameAllocator::new(
            PhysicalAddress::new(PAGE_SIZE),
            PhysicalAddress::new(PAGE_SIZE * STACK_PAGES),
        );
        let mut space = AddressSpace::new();
        assert_eq!(
            space.prepare_load(&frames),
            Err(AddressSpaceError::OutOfMemory)
        );
        assert_eq!(space.stack_base(), None);
    }

    #[test]
    fn contains_covers_segments_and_stack() {
        let frames = frames();
        let mut space = AddressSpace::new();
        space.define_region(VirtualAddress::new(0x0100), 32).unwrap();
        space.define_region(VirtualAddress::new(0x0400), 16).unwrap();

        assert!(!space.contains(VirtualAddress::new(USER_STACK - PAGE_SIZE)));
        space.prepare_load(&frames).unwrap();

        assert!(space.contains(VirtualAddress::new(0x0100)));
        assert!(space.contains(VirtualAddress::new(0x011F)));
        assert!(!space.contains(VirtualAddress::new(0x0120)));
        assert!(space.contains(VirtualAddress::new(0x0400)));
        assert!(!space.contains(VirtualAddress::new(0x0410)));
        assert!(space.contains(VirtualAddress::new(USER_STACK - PAGE_SIZE)));
        assert!(!space.contains(VirtualAddress::new(
            USER_STACK - (STACK_PAGES + 1) * PAGE_SIZE
        )));
    }

    #[test]
    fn complete_space_passes_validation() {
        let frames = frames();
        let mut space = AddressSpace::new();
        space.define_region(VirtualAddress::new(0x0100), 32).unwrap();
        space.define_region(VirtualAddress::new(0x0400), 16).unwrap();
        space.prepare_load(&frames).unwrap();

        space.assert_valid();
    }

    #[test]
    #[should_panic(expected = "dumbvm: address space has no data segment")]
    fn missing_data_segment_is_fatal() {
        let mut space = AddressSpace::new();
        space.define_region(VirtualAddress::new(0x0100), 32).unwrap();
        space.assert_valid();
    }

    #[test]
    #[should_panic(expected = "dumbvm: empty code segment")]
    fn segment_at_zero_is_fatal() {
        let frames = frames();
        let mut space = AddressSpace::new();
        space.define_region(VirtualAddress::new(0), 32).unwrap();
        space.define_region(VirtualAddress::new(0x0400), 16).unwrap();
        space.prepare_load(&frames).unwrap();
        space.assert_valid();
    }
}
