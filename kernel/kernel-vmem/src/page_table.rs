//! Typed wrappers for the two paging levels: the page directory (PD) and the
//! page tables (PT) it points at. Entries are accessed through narrow index
//! newtypes so a PD index can never be used to address a PT.

use crate::PageEntryBits;
use kernel_addresses::{PhysicalPage, Size4K, Size4M, VirtualAddress};

/// Page directory index (bits 31..22).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PdIndex(u16);

/// Page table index (bits 21..12).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PtIndex(u16);

impl PdIndex {
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u32() >> 22) & 0x3FF) as u16)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 1024);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl PtIndex {
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u32() >> 12) & 0x3FF) as u16)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 1024);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Both table indices of a virtual address in walk order.
#[inline]
#[must_use]
pub const fn split_indices(va: VirtualAddress) -> (PdIndex, PtIndex) {
    (PdIndex::from(va), PtIndex::from(va))
}

/// A page directory entry: either → page table (PS=0) or a 4 MiB leaf (PS=1).
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PdEntry(PageEntryBits);

/// Decoded form of a present [`PdEntry`].
pub enum PdEntryKind {
    /// Points at a page table frame.
    NextPageTable(PhysicalPage<Size4K>, PageEntryBits),
    /// Directly maps a 4 MiB page.
    Leaf4MiB(PhysicalPage<Size4M>, PageEntryBits),
}

impl PdEntry {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn kind(self) -> Option<PdEntryKind> {
        if !self.is_present() {
            return None;
        }

        let flags = self.0;
        let base = self.0.physical_address();
        if flags.large_page() {
            Some(PdEntryKind::Leaf4MiB(PhysicalPage::from_addr(base), flags))
        } else {
            Some(PdEntryKind::NextPageTable(
                PhysicalPage::from_addr(base),
                flags,
            ))
        }
    }

    #[inline]
    #[must_use]
    pub const fn make_next(pt_page: PhysicalPage<Size4K>, mut flags: PageEntryBits) -> Self {
        flags.set_large_page(false);
        flags.set_present(true);
        flags.set_physical_address(pt_page.base());
        Self(flags)
    }

    #[inline]
    #[must_use]
    pub const fn make_4m(page: PhysicalPage<Size4M>, mut flags: PageEntryBits) -> Self {
        flags.set_large_page(true);
        flags.set_present(true);
        flags.set_physical_address(page.base());
        Self(flags)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0.into_bits()
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(PageEntryBits::from_bits(v))
    }
}

/// A page table entry: a 4 KiB leaf only (PS must be 0).
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PtEntry(PageEntryBits);

impl PtEntry {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn page_4k(self) -> Option<(PhysicalPage<Size4K>, PageEntryBits)> {
        if !self.is_present() {
            return None;
        }
        debug_assert!(!self.0.large_page(), "PTE must have PS=0");
        Some((PhysicalPage::from_addr(self.0.physical_address()), self.0))
    }

    #[inline]
    #[must_use]
    pub const fn make_4k(page: PhysicalPage<Size4K>, mut flags: PageEntryBits) -> Self {
        flags.set_large_page(false);
        flags.set_present(true);
        flags.set_physical_address(page.base());
        Self(flags)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0.into_bits()
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(PageEntryBits::from_bits(v))
    }
}

/// The root paging structure: 1024 PDEs covering the full 4 GiB space.
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PdEntry; 1024],
}

impl PageDirectory {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdEntry::zero(); 1024],
        }
    }

    /// Reset all entries to not-present.
    #[inline]
    pub fn zero(&mut self) {
        self.entries = [PdEntry::zero(); 1024];
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: PdIndex) -> PdEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: PdIndex, e: PdEntry) {
        self.entries[i.as_usize()] = e;
    }
}

/// One page table: 1024 PTEs covering a 4 MiB slot of the address space.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PtEntry; 1024],
}

impl PageTable {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PtEntry::zero(); 1024],
        }
    }

    /// Reset all entries to not-present.
    #[inline]
    pub fn zero(&mut self) {
        self.entries = [PtEntry::zero(); 1024];
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: PtIndex) -> PtEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: PtIndex, e: PtEntry) {
        self.entries[i.as_usize()] = e;
    }
}

// The MMU walks these as raw 4 KiB frames; the layout is load-bearing.
const _: () = assert!(size_of::<PageDirectory>() == 4096);
const _: () = assert!(align_of::<PageDirectory>() == 4096);
const _: () = assert!(size_of::<PageTable>() == 4096);
const _: () = assert!(align_of::<PageTable>() == 4096);
