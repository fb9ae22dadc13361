//! # Address Space (x86, PD-rooted)
//!
//! Strongly-typed helpers to build and manipulate a **single** virtual address
//! space (tree rooted at a page directory). This complements the typed paging
//! layers (`PageDirectory`, `PageTable`).
//!
//! ## Highlights
//!
//! - `AddressSpace::map_one` to install one 4 KiB mapping, allocating the
//!   intermediate page table on demand.
//! - `AddressSpace::map_one_4m` to install a 4 MiB leaf directly in the PD.
//! - `AddressSpace::map_identity_range` to identity-map a physical byte
//!   range at page granularity.
//! - `AddressSpace::unmap_one` to clear a single 4 KiB PTE.
//! - `AddressSpace::translate` to walk a VA to its PA (handles 4 MiB leaves).
//! - `AddressSpace::activate` to load CR3 with this space's root.
//!
//! ## Design
//!
//! - Non-leaf entries are created with caller-provided **non-leaf flags**
//!   (typically present + writable). Leaf flags come from the mapping call.
//!   We never silently set US or G; the caller decides.
//! - Uses `PhysicalPage<Size4K>` for page-table frames, and `VirtualAddress` /
//!   `PhysicalAddress` for endpoints.
//! - Keeps `unsafe` confined to mapping a physical frame to a typed table
//!   through the `PhysMapper`.
//!
//! ## Safety
//!
//! - Mutating active mappings requires appropriate **TLB maintenance**
//!   (`invlpg` per page or a CR3 reload).
//! - The provided `PhysMapper` must yield **writable** references to table
//!   frames.

use crate::page_table::{
    PageDirectory, PageTable, PdEntry, PdEntryKind, PdIndex, PtEntry, PtIndex, split_indices,
};
use crate::{FrameAlloc, PageEntryBits, PhysMapper};
use kernel_addresses::{
    PageSize, PhysicalAddress, PhysicalPage, Size4K, Size4M, VirtualAddress, VirtualPage,
    align_down,
};
use thiserror::Error;

/// Failure modes of mapping operations.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum MapError {
    /// The frame allocator ran dry while a page table was needed.
    #[error("out of physical frames while allocating a page table")]
    PageTableExhausted,
}

/// Failure modes of [`AddressSpace::unmap_one`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum UnmapError {
    /// No present PDE covers the address.
    #[error("no page table covers the address")]
    MissingPageTable,
    /// The PDE is a 4 MiB leaf; individual 4 KiB pages cannot be unmapped
    /// from it.
    #[error("address is covered by a 4 MiB mapping")]
    LargePage,
    /// The PTE exists but is not present.
    #[error("page was not mapped")]
    NotMapped,
}

/// The page directory root page for an [`AddressSpace`].
pub type RootPage = PhysicalPage<Size4K>;

/// Handle to a single, concrete address space.
pub struct AddressSpace<'m, M: PhysMapper> {
    root: RootPage,
    mapper: &'m M,
}

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// Wrap an existing root frame (e.g. one set up by early boot code).
    #[inline]
    pub const fn from_root(mapper: &'m M, root: RootPage) -> Self {
        Self { root, mapper }
    }

    /// Allocate and zero a fresh page directory, returning the space rooted
    /// at it.
    ///
    /// # Errors
    /// [`MapError::PageTableExhausted`] if no frame is available.
    pub fn new<A: FrameAlloc>(mapper: &'m M, alloc: &mut A) -> Result<Self, MapError> {
        let root = alloc.alloc_frame().ok_or(MapError::PageTableExhausted)?;
        let space = Self { root, mapper };
        space.directory_mut().zero();
        Ok(space)
    }

    /// Physical page of the page directory.
    #[inline]
    #[must_use]
    pub const fn root_page(&self) -> RootPage {
        self.root
    }

    /// Borrow the [`PageDirectory`] as a typed table.
    #[inline]
    pub(crate) fn directory_mut(&self) -> &mut PageDirectory {
        // SAFETY: the root frame holds the page directory by construction.
        unsafe { self.mapper.phys_to_mut(self.root.base()) }
    }

    /// Borrow a [`PageTable`] in `page`.
    #[inline]
    pub(crate) fn table_mut(&self, page: PhysicalPage<Size4K>) -> &mut PageTable {
        // SAFETY: only frames installed via `make_next` are passed here.
        unsafe { self.mapper.phys_to_mut(page.base()) }
    }

    /// Read the PD slot at `index`.
    #[must_use]
    pub fn pd_entry(&self, index: PdIndex) -> PdEntry {
        self.directory_mut().get(index)
    }

    /// Read a PT slot inside the table stored in `table`.
    ///
    /// `table` must be a frame previously linked via a non-leaf PD entry;
    /// use [`Self::pd_entry`] to discover it.
    #[must_use]
    pub fn pt_entry(&self, table: PhysicalPage<Size4K>, index: PtIndex) -> PtEntry {
        self.table_mut(table).get(index)
    }

    /// Map **one** 4 KiB page at `vp → pp` with `leaf_flags`.
    ///
    /// A missing page table is allocated from `alloc`, zeroed and linked
    /// into the PD with `nonleaf_flags`. An existing PTE at the slot is
    /// overwritten.
    ///
    /// # Errors
    /// [`MapError::PageTableExhausted`] if a page table is needed and the
    /// allocator has no frame for it.
    pub fn map_one<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        vp: VirtualPage<Size4K>,
        pp: PhysicalPage<Size4K>,
        nonleaf_flags: PageEntryBits,
        leaf_flags: PageEntryBits,
    ) -> Result<(), MapError> {
        let (i2, i1) = split_indices(vp.base());

        let pd = self.directory_mut();
        let pt_page = match pd.get(i2).kind() {
            Some(PdEntryKind::NextPageTable(page, _)) => page,
            // A 4 MiB leaf in the slot is replaced by a fresh table; the
            // previous large mapping is discarded.
            Some(PdEntryKind::Leaf4MiB(..)) | None => {
                let page = alloc.alloc_frame().ok_or(MapError::PageTableExhausted)?;
                self.table_mut(page).zero();
                pd.set(i2, PdEntry::make_next(page, nonleaf_flags));
                page
            }
        };

        let pt = self.table_mut(pt_page);
        pt.set(i1, PtEntry::make_4k(pp, leaf_flags));
        Ok(())
    }

    /// Map **one** 4 MiB leaf at `vp → pp` directly in the PD.
    ///
    /// Overwrites whatever occupied the PD slot; a previously linked page
    /// table frame is orphaned, not reclaimed.
    pub fn map_one_4m(
        &self,
        vp: VirtualPage<Size4M>,
        pp: PhysicalPage<Size4M>,
        leaf_flags: PageEntryBits,
    ) {
        let (i2, _) = split_indices(vp.base());
        self.directory_mut().set(i2, PdEntry::make_4m(pp, leaf_flags));
    }

    /// Identity-map the physical byte range `start..end` with 4 KiB pages,
    /// so that every mapped VA translates to the equal-valued PA.
    ///
    /// `start` is aligned **down** and `end` aligned **up** to page bounds,
    /// so any byte inside the range is covered. An empty range maps nothing.
    /// Returns the number of pages mapped.
    ///
    /// # Errors
    /// [`MapError::PageTableExhausted`] if a page table allocation fails
    /// part-way; mappings installed before the failure remain in place.
    pub fn map_identity_range<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        start: PhysicalAddress,
        end: PhysicalAddress,
        nonleaf_flags: PageEntryBits,
        leaf_flags: PageEntryBits,
    ) -> Result<u32, MapError> {
        if end.as_u32() <= start.as_u32() {
            return Ok(0);
        }

        let first = u64::from(align_down(start.as_u32(), Size4K::SIZE));
        // Computed in u64: a range touching the top of the address space
        // would overflow the u32 ceil.
        let limit = (u64::from(end.as_u32()) + u64::from(Size4K::SIZE) - 1)
            & !(u64::from(Size4K::SIZE) - 1);

        let mut mapped = 0;
        let mut at = first;
        while at < limit {
            #[allow(clippy::cast_possible_truncation)]
            let base = at as u32;
            let pp = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(base));
            let vp = VirtualPage::<Size4K>::from_addr(VirtualAddress::new(base));
            self.map_one(alloc, vp, pp, nonleaf_flags, leaf_flags)?;
            mapped += 1;
            at += u64::from(Size4K::SIZE);
        }
        Ok(mapped)
    }

    /// Unmap a single **4 KiB** page at `vp`.
    ///
    /// The page table frame is left in place even if it becomes empty.
    ///
    /// # Errors
    /// See [`UnmapError`] for the ways the walk can come up short.
    pub fn unmap_one(&self, vp: VirtualPage<Size4K>) -> Result<(), UnmapError> {
        let (i2, i1) = split_indices(vp.base());

        let pd = self.directory_mut();
        let pt_page = match pd.get(i2).kind() {
            Some(PdEntryKind::NextPageTable(page, _)) => page,
            Some(PdEntryKind::Leaf4MiB(..)) => return Err(UnmapError::LargePage),
            None => return Err(UnmapError::MissingPageTable),
        };

        let pt = self.table_mut(pt_page);
        if !pt.get(i1).is_present() {
            return Err(UnmapError::NotMapped);
        }
        pt.set(i1, PtEntry::zero());
        Ok(())
    }

    /// Translate a `VirtualAddress` to a `PhysicalAddress` if mapped.
    ///
    /// Handles 4 MiB leaves by adding the appropriate **in-page offset**.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let (i2, i1) = split_indices(va);

        let pd = self.directory_mut();
        match pd.get(i2).kind()? {
            PdEntryKind::Leaf4MiB(base, _) => {
                let base: PhysicalPage<Size4M> = base;
                Some(base.join(va.offset::<Size4M>()))
            }
            PdEntryKind::NextPageTable(pt_page, _) => {
                let pt = self.table_mut(pt_page);
                let (base, _) = pt.get(i1).page_4k()?;
                Some(base.join(va.offset::<Size4K>()))
            }
        }
    }

    /// Load CR3 with this address space's root.
    ///
    /// # Safety
    /// Must run at CPL0. The mappings reachable from the root must cover the
    /// currently executing code and stack, or the next instruction fetch
    /// faults.
    #[cfg(target_arch = "x86")]
    #[inline]
    pub unsafe fn activate(&self) {
        let cr3 = self.root.base().as_u32();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}
