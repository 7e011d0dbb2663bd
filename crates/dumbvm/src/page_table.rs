//! Two-level page table.
//!
//! The page table is the sole authority on which frame backs a user page. The fault
//! handler never computes a translation itself; it asks the
//! [`PageTableBridge`](crate::PageTableBridge), which consults this table.

use alloc::boxed::Box;

use crate::{
    PhysicalAddress, VirtualAddress,
    arch::{self, ENTRY_COUNT},
};

/// Page table entry flags.
///
/// Flags are stored in the low bits of an entry, below the page-aligned frame address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFlags(usize);

impl PageFlags {
    /// Present bit (bit 0).
    const PRESENT: usize = 1 << 0;

    /// Writable bit (bit 1).
    const WRITABLE: usize = 1 << 1;

    /// Creates empty page flags (page not present).
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates flags for a writable page.
    pub const fn writable() -> Self {
        Self(Self::WRITABLE)
    }

    /// Returns whether the present bit is set.
    pub const fn is_present(self) -> bool {
        (self.0 & Self::PRESENT) != 0
    }

    /// Sets or clears the present bit.
    pub fn set_present(&mut self, present: bool) {
        if present {
            self.0 |= Self::PRESENT;
        } else {
            self.0 &= !Self::PRESENT;
        }
    }

    /// Returns whether the writable bit is set.
    pub const fn is_writable(self) -> bool {
        (self.0 & Self::WRITABLE) != 0
    }
}

impl Default for PageFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single page table entry: a frame address with flags packed into its page offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct PageEntry(usize);

impl PageEntry {
    const FLAGS_MASK: usize = arch::PAGE_SIZE - 1;

    /// Creates a new page table entry.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not page-aligned.
    pub fn new(frame: PhysicalAddress, flags: PageFlags) -> Self {
        assert!(
            frame.is_aligned(arch::PAGE_SIZE),
            "physical address must be page-aligned"
        );
        Self(frame.as_usize() | (flags.0 & Self::FLAGS_MASK))
    }

    /// Returns the frame stored in this entry, or `None` if it is not present.
    pub fn frame(self) -> Option<PhysicalAddress> {
        self.is_present()
            .then(|| PhysicalAddress::new(self.0 & !Self::FLAGS_MASK))
    }

    /// Returns the flags for this entry.
    pub const fn flags(self) -> PageFlags {
        PageFlags(self.0 & Self::FLAGS_MASK)
    }

    /// Returns whether this entry is present.
    pub const fn is_present(self) -> bool {
        self.flags().is_present()
    }
}

type Table = [PageEntry; ENTRY_COUNT];

/// A two-level page table mapping user pages to frames.
///
/// The level 1 directory is allocated up front; level 0 tables are allocated from the
/// kernel heap the first time a page in their range is mapped.
pub struct PageTable {
    directory: Box<[Option<Box<Table>>; ENTRY_COUNT]>,
    mapped: usize,
}

impl PageTable {
    /// Creates an empty page table.
    pub fn new() -> Self {
        Self {
            directory: Box::new(core::array::from_fn(|_| None)),
            mapped: 0,
        }
    }

    /// Maps `page` to `frame`, replacing any previous mapping.
    ///
    /// The present bit is always set on the stored entry.
    ///
    /// # Panics
    ///
    /// Panics if either address is not page-aligned.
    pub fn map(&mut self, page: VirtualAddress, frame: PhysicalAddress, flags: PageFlags) {
        assert!(
            page.is_aligned(arch::PAGE_SIZE),
            "virtual address must be page-aligned"
        );

        let mut flags = flags;
        flags.set_present(true);
        let new_entry = PageEntry::new(frame, flags);

        let entry = self.walk_or_create(page);
        let newly_mapped = !entry.is_present();
        *entry = new_entry;
        if newly_mapped {
            self.mapped += 1;
        }
    }

    /// Returns the frame backing `page`, if it is mapped.
    pub fn translate(&self, page: VirtualAddress) -> Option<PhysicalAddress> {
        self.walk(page).and_then(|entry| entry.frame())
    }

    /// Returns the number of pages currently mapped.
    pub fn mapped_pages(&self) -> usize {
        self.mapped
    }

    fn walk(&self, page: VirtualAddress) -> Option<PageEntry> {
        let table = self.directory[page.page_index(1)].as_ref()?;
        Some(table[page.page_index(0)])
    }

    fn walk_or_create(&mut self, page: VirtualAddress) -> &mut PageEntry {
        let table = self.directory[page.page_index(1)]
            .get_or_insert_with(|| Box::new([PageEntry::default(); ENTRY_COUNT]));
        &mut table[page.page_index(0)]
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> VirtualAddress {
        VirtualAddress::new(n * arch::PAGE_SIZE)
    }

    fn frame(n: usize) -> PhysicalAddress {
        PhysicalAddress::new(n * arch::PAGE_SIZE)
    }

    #[test]
    fn unmapped_page_translates_to_none() {
        let table = PageTable::new();
        assert_eq!(table.translate(page(3)), None);
        assert_eq!(table.mapped_pages(), 0);
    }

    #[test]
    fn maps_and_translates() {
        let mut table = PageTable::new();
        table.map(page(3), frame(7), PageFlags::writable());

        assert_eq!(table.translate(page(3)), Some(frame(7)));
        assert_eq!(table.translate(page(4)), None);
        assert_eq!(table.mapped_pages(), 1);
    }

    #[test]
    fn remap_replaces_without_recounting() {
        let mut table = PageTable::new();
        table.map(page(3), frame(7), PageFlags::writable());
        table.map(page(3), frame(8), PageFlags::writable());

        assert_eq!(table.translate(page(3)), Some(frame(8)));
        assert_eq!(table.mapped_pages(), 1);
    }

    #[test]
    fn maps_across_directory_entries() {
        let mut table = PageTable::new();
        // One page in the first level 0 table, one in the last.
        let low = page(1);
        let high = page(ENTRY_COUNT * (ENTRY_COUNT - 1));
        assert_ne!(low.page_index(1), high.page_index(1));

        table.map(low, frame(2), PageFlags::writable());
        table.map(high, frame(3), PageFlags::empty());

        assert_eq!(table.translate(low), Some(frame(2)));
        assert_eq!(table.translate(high), Some(frame(3)));
        assert_eq!(table.mapped_pages(), 2);
    }

    #[test]
    fn entry_packs_flags_below_frame() {
        let entry = PageEntry::new(frame(5), PageFlags::writable());
        assert!(!entry.is_present());
        assert!(entry.flags().is_writable());
        assert_eq!(entry.frame(), None);
    }

    #[test]
    #[should_panic(expected = "virtual address must be page-aligned")]
    fn rejects_unaligned_page() {
        PageTable::new().map(page(1) + 1, frame(1), PageFlags::writable());
    }
}
