//! Physical frame allocation.
//!
//! Frames come from a single bump region between the end of the kernel image and the end
//! of RAM. Nothing is ever returned to it: the cursor only moves forward, and kernel pages
//! released through [`free_kpages`] are leaked.

use spin::Mutex;

use crate::{PhysicalAddress, VirtualAddress, arch::PAGE_SIZE};

/// Hands out physical frames from an unreclaimed bump region.
///
/// The cursor lives behind a spinlock that is held only across the read-and-advance, so
/// the allocator may be shared between execution contexts. It must never be called from
/// inside a TLB critical section.
pub struct FrameAllocator {
    cursor: Mutex<Cursor>,
}

struct Cursor {
    next: PhysicalAddress,
    end: PhysicalAddress,
}

impl FrameAllocator {
    /// Creates an allocator over `[first_free, last)`.
    ///
    /// `first_free` is rounded up to a page boundary and `last` down to one.
    ///
    /// # Panics
    ///
    /// Panics if `first_free` is zero (zero is never a valid frame) or if the region is
    /// inverted.
    pub const fn new(first_free: PhysicalAddress, last: PhysicalAddress) -> Self {
        assert!(!first_free.is_null(), "first free frame must be non-zero");
        let next = first_free.align_up(PAGE_SIZE);
        let end = last.align_down(PAGE_SIZE);
        assert!(
            next.as_usize() <= end.as_usize(),
            "frame region ends before it starts"
        );
        Self {
            cursor: Mutex::new(Cursor { next, end }),
        }
    }

    /// Allocates `npages` contiguous frames and returns the first one.
    ///
    /// # Panics
    ///
    /// Panics if `npages` is zero or if physical memory is exhausted; frames are never
    /// reclaimed, so there is nothing to wait for.
    pub fn allocate_frames(&self, npages: usize) -> PhysicalAddress {
        match self.try_allocate_frames(npages) {
            Some(base) => base,
            None => panic!("dumbvm: out of physical memory allocating {npages} pages"),
        }
    }

    /// Allocates `npages` contiguous frames, or returns `None` if too few remain.
    ///
    /// A failed call leaves the cursor where it was.
    ///
    /// # Panics
    ///
    /// Panics if `npages` is zero.
    pub fn try_allocate_frames(&self, npages: usize) -> Option<PhysicalAddress> {
        assert!(npages > 0, "must allocate at least one page");
        let size = npages.checked_mul(PAGE_SIZE)?;

        let mut cursor = self.cursor.lock();
        if size > cursor.end - cursor.next {
            return None;
        }
        let base = cursor.next;
        cursor.next = base + size;
        drop(cursor);

        log::trace!("stole {npages} pages at {base}");
        Some(base)
    }

    /// Returns the number of bytes still available.
    pub fn remaining(&self) -> usize {
        let cursor = self.cursor.lock();
        cursor.end - cursor.next
    }

    /// Allocates `npages` frames for kernel use and returns their direct-mapped address.
    ///
    /// Returns `None` when physical memory is exhausted.
    pub fn alloc_kpages(&self, npages: usize) -> Option<VirtualAddress> {
        self.try_allocate_frames(npages)
            .map(VirtualAddress::direct_mapped)
    }
}

/// Releases kernel pages obtained from [`FrameAllocator::alloc_kpages`].
///
/// Frames are never reclaimed, so this leaks them.
pub fn free_kpages(addr: VirtualAddress) {
    log::trace!("leaking kernel pages at {addr}");
}
