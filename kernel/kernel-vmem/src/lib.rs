//! # Virtual Memory Support
//!
//! Two-level x86 (32-bit, non-PAE) paging for the kernel.
//!
//! ## What you get
//! - Typed paging structures: [`PageDirectory`], [`PageTable`] and their
//!   entry wrappers ([`PdEntry`], [`PtEntry`]).
//! - The raw entry bitfield [`PageEntryBits`] shared by both levels.
//! - An [`AddressSpace`] rooted at a page directory frame, with mapping,
//!   unmapping, identity-range and translate operations.
//! - A tiny allocator/mapper interface ([`FrameAlloc`], [`PhysMapper`]).
//! - CR0/CR3 control helpers (on x86 builds only).
//!
//! ## x86 Virtual Address → Physical Address Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22 | 21‒12 | 11‒0   |
//! |   PD  |   PT  | Offset |
//! ```
//!
//! The CPU uses these fields as **indices** into two levels of page tables,
//! each level containing 1024 (2¹⁰) entries of 4 bytes (32 bits) each.
//!
//! ```text
//!  PD  →  PT  →  Physical Page
//!  │       │
//!  │       └───► PTE (Page Table Entry) → maps 4 KiB page
//!  └───────────► PDE (Page Directory Entry) → PS=1 → 4 MiB page
//! ```
//!
//! ### Levels and their roles
//!
//! | Level | Table name | Entry name | Description |
//! |:------|:-----------|:-----------|:------------|
//! | 1 | **PD** (Page Directory) | **PDE** | Top-level table; each entry points to a PT. One PD per address space, referenced by Control Register 3 ([`CR3`](https://wiki.osdev.org/CPU_Registers_x86#CR3)). If `PS=1`, it directly maps a 4 MiB page (leaf). |
//! | 2 | **PT** (Page Table) | **PTE** | Each entry maps a 4 KiB physical page (always a leaf). |
//!
//! ### Leaf vs. non-leaf entries
//!
//! - A **leaf entry** directly maps physical memory; it contains the
//!   physical base address and the permission bits.
//!   - A **PTE** is always a leaf (maps 4 KiB).
//!   - A **PDE** with `PS=1` is a leaf (maps 4 MiB, requires CR4.PSE).
//! - A **non-leaf entry** (PDE with `PS=0`) points to a page table and
//!   continues the walk.
//!
//! ### Summary
//!
//! A 32-bit virtual address is effectively:
//!
//! ```text
//! VA = [PD:10] [PT:10] [Offset:12]
//! ```
//!
//! This creates a two-level translation tree mapping the full **4 GiB**
//! address space, using leaf pages of 4 MiB or 4 KiB depending on where the
//! translation stops.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
mod page_entry_bits;
mod page_table;

pub use crate::address_space::{AddressSpace, MapError, RootPage, UnmapError};
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::{
    PageDirectory, PageTable, PdEntry, PdEntryKind, PdIndex, PtEntry, PtIndex, split_indices,
};

use kernel_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Minimal frame allocator used to obtain **physical** 4 KiB frames for page
/// tables.
///
/// The implementation decides where frames come from (boot pool, free list,
/// etc.). Returned frames must be zero-fillable and exclusively owned by the
/// paging code from this point on.
///
/// Returns `None` on out-of-memory.
pub trait FrameAlloc {
    /// Allocate one 4 KiB physical frame.
    fn alloc_frame(&mut self) -> Option<PhysicalPage<Size4K>>;
}

/// Converts physical addresses to usable pointers in the current virtual
/// address space.
///
/// During early boot the kernel runs on an identity map, so the production
/// mapper returns direct pointers; hosted tests substitute a simulated RAM
/// backing store.
pub trait PhysMapper {
    /// Convert a *physical* address to a mutable reference in the current
    /// address space.
    ///
    /// # Safety
    /// - `pa` must be mapped writable in the current page tables for the
    ///   whole lifetime `'a`.
    /// - The bytes at `pa` must be a valid `T` (no aliasing UB).
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// Identity mapper for the boot configuration where VA == PA holds for all
/// memory the kernel touches.
pub struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        // SAFETY: caller guarantees the identity mapping covers `pa`.
        unsafe { &mut *(pa.as_u32() as usize as *mut T) }
    }
}

/// Read the current page directory base from CR3.
///
/// # Safety
/// Must run at CPL0.
#[cfg(target_arch = "x86")]
#[inline]
#[must_use]
pub unsafe fn read_cr3() -> PhysicalAddress {
    let cr3: u32;
    unsafe {
        core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
    }
    PhysicalAddress::new(cr3 & !0xFFF)
}

/// Load CR3 with `root`, set CR4.PSE so 4 MiB leaves are honored, then set
/// CR0.PG, turning paging on.
///
/// # Safety
/// Must run at CPL0. The tables reachable from `root` must identity-map the
/// currently executing code, the stack and every device range in use, or
/// the instruction after `mov cr0` faults.
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn enable_paging(root: RootPage) {
    let cr3 = root.base().as_u32();
    unsafe {
        core::arch::asm!(
            "mov cr3, {root}",
            "mov {tmp}, cr4",
            "or {tmp}, 0x10",
            "mov cr4, {tmp}",
            "mov {tmp}, cr0",
            "or {tmp}, 0x80000000",
            "mov cr0, {tmp}",
            root = in(reg) cr3,
            tmp = out(reg) _,
            options(nostack),
        );
    }
}

/// Drop one page's translation from the TLB.
///
/// # Safety
/// Must run at CPL0.
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn invalidate_page(va: kernel_addresses::VirtualAddress) {
    unsafe {
        core::arch::asm!(
            "invlpg [{}]",
            in(reg) va.as_u32(),
            options(nostack, preserves_flags),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_addresses::{Size4M, VirtualAddress, VirtualPage};
    use std::vec::Vec;

    /// A trivial **bump** allocator: always hands out the next 4 KiB frame.
    ///
    /// It only keeps a cursor (`next`) and bumps it by 4096 on each alloc.
    /// No free list, no reuse (perfect for tests).
    struct BumpAlloc {
        /// Next free physical byte address (must remain 4 KiB aligned)
        next: u32,
        /// Exclusive end (bounds check)
        end: u32,
    }

    impl BumpAlloc {
        fn new(start: u32, end: u32) -> Self {
            Self { next: start, end }
        }
    }

    impl FrameAlloc for BumpAlloc {
        fn alloc_frame(&mut self) -> Option<PhysicalPage<Size4K>> {
            if self.next + 4096 > self.end {
                return None;
            }
            let p = self.next;
            self.next += 4096;
            Some(PhysicalPage::from_addr(PhysicalAddress::new(p)))
        }
    }

    /// A 4 KiB-aligned raw frame. We use this as our "physical RAM" backing
    /// store in tests.
    #[repr(align(4096))]
    struct Aligned4K(#[allow(dead_code)] [u8; 4096]);

    impl Aligned4K {
        fn new_zeroed() -> Self {
            Self([0u8; 4096])
        }
    }

    /// A tiny in-memory "RAM" with physical addresses as byte offsets from 0.
    ///
    /// The mapper turns a physical address into a `&mut T` by:
    ///   1) picking the frame `pa / 4096`,
    ///   2) casting that 4 KiB block to `&mut T` (caller ensures the type
    ///      matches).
    ///
    /// This is *only* for tests. Real mappers must honor whatever identity
    /// mapping is actually set up.
    struct TestPhys {
        frames: Vec<Aligned4K>,
    }

    impl TestPhys {
        fn with_frames(n: usize) -> Self {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(Aligned4K::new_zeroed());
            }
            Self { frames: v }
        }

        fn frame_mut_ptr(&self, idx: usize) -> *mut u8 {
            // SAFETY: frames are 4 KiB aligned; we return a pointer into the owned buffer.
            &self.frames[idx] as *const Aligned4K as *mut u8
        }
    }

    impl PhysMapper for TestPhys {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            let idx = (pa.as_u32() >> 12) as usize;
            let off = (pa.as_u32() & 0xfff) as usize;
            // For page tables we expect offset==0; assert to catch misuse in the test.
            debug_assert_eq!(off, 0);

            // SAFETY: The caller promises `T` matches the bytes in the frame.
            unsafe { &mut *(self.frame_mut_ptr(idx).cast::<T>()) }
        }
    }

    fn writable() -> PageEntryBits {
        PageEntryBits::new().with_writable(true)
    }

    fn space<'a>(phys: &'a TestPhys, alloc: &mut BumpAlloc) -> AddressSpace<'a, TestPhys> {
        AddressSpace::new(phys, alloc).expect("root allocation")
    }

    #[test]
    fn map_one_4k_creates_table_and_leaf() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        let va = VirtualAddress::new(0x0040_2000);
        let pa = PhysicalAddress::new(0x0030_0000);
        aspace
            .map_one(&mut alloc, va.page(), pa.page(), writable(), writable())
            .expect("map_one");

        // Walk the tables again and verify entries were created and look sane.
        let (i2, i1) = split_indices(va);
        let pd: &mut PageDirectory = unsafe { phys.phys_to_mut(aspace.root_page().base()) };
        let e2 = pd.get(i2);
        assert!(e2.is_present());
        assert!(!e2.flags().large_page());

        let pt: &mut PageTable = unsafe { phys.phys_to_mut(e2.flags().physical_address()) };
        let e1 = pt.get(i1);
        assert!(e1.is_present());
        assert!(e1.flags().writable());
        assert_eq!(e1.flags().physical_address(), pa);
    }

    #[test]
    fn translate_adds_page_offset() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        let va = VirtualAddress::new(0x0040_2000);
        let pa = PhysicalAddress::new(0x0030_0000);
        aspace
            .map_one(&mut alloc, va.page(), pa.page(), writable(), writable())
            .expect("map_one");

        let probe = VirtualAddress::new(va.as_u32() + 0xABC);
        assert_eq!(
            aspace.translate(probe),
            Some(PhysicalAddress::new(pa.as_u32() + 0xABC))
        );
    }

    #[test]
    fn translate_unmapped_returns_none() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        assert_eq!(aspace.translate(VirtualAddress::new(0xDEAD_B000)), None);

        // A sibling in an existing page table is still unmapped.
        let va = VirtualAddress::new(0x0040_2000);
        aspace
            .map_one(
                &mut alloc,
                va.page(),
                PhysicalAddress::new(0x0030_0000).page(),
                writable(),
                writable(),
            )
            .expect("map_one");
        assert_eq!(aspace.translate(VirtualAddress::new(0x0040_3000)), None);
    }

    #[test]
    fn remap_overwrites_previous_leaf() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        let va = VirtualAddress::new(0x0080_0000);
        aspace
            .map_one(
                &mut alloc,
                va.page(),
                PhysicalAddress::new(0x0010_0000).page(),
                writable(),
                writable(),
            )
            .expect("first map");
        aspace
            .map_one(
                &mut alloc,
                va.page(),
                PhysicalAddress::new(0x0020_0000).page(),
                writable(),
                writable(),
            )
            .expect("second map");

        assert_eq!(
            aspace.translate(va),
            Some(PhysicalAddress::new(0x0020_0000))
        );
    }

    #[test]
    fn map_fails_when_out_of_frames() {
        let phys = TestPhys::with_frames(2);
        // Exactly one frame: enough for the root PD, nothing for a PT.
        let mut alloc = BumpAlloc::new(0, 1 << 12);
        let aspace = space(&phys, &mut alloc);

        let err = aspace
            .map_one(
                &mut alloc,
                VirtualAddress::new(0x0040_0000).page(),
                PhysicalAddress::new(0x0010_0000).page(),
                writable(),
                writable(),
            )
            .expect_err("no frame for the page table");
        assert_eq!(err, MapError::PageTableExhausted);
    }

    #[test]
    fn unmap_then_translate_misses() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        let va = VirtualAddress::new(0x0040_2000);
        aspace
            .map_one(
                &mut alloc,
                va.page(),
                PhysicalAddress::new(0x0030_0000).page(),
                writable(),
                writable(),
            )
            .expect("map_one");

        aspace.unmap_one(va.page()).expect("unmap");
        assert_eq!(aspace.translate(va), None);
        assert_eq!(aspace.unmap_one(va.page()), Err(UnmapError::NotMapped));
        assert_eq!(
            aspace.unmap_one(VirtualAddress::new(0x1000_0000).page()),
            Err(UnmapError::MissingPageTable)
        );
    }

    #[test]
    fn map_4m_sets_ps_bit_and_translates() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        let vp = VirtualPage::<Size4M>::from_addr(VirtualAddress::new(0x0080_0000));
        let pp = PhysicalPage::<Size4M>::from_addr(PhysicalAddress::new(0x0040_0000));
        aspace.map_one_4m(vp, pp, writable());

        let (i2, _) = split_indices(vp.base());
        let pd: &mut PageDirectory = unsafe { phys.phys_to_mut(aspace.root_page().base()) };
        assert!(pd.get(i2).flags().large_page());

        let probe = VirtualAddress::new(0x0080_0000 + 0x0012_3456);
        assert_eq!(
            aspace.translate(probe),
            Some(PhysicalAddress::new(0x0040_0000 + 0x0012_3456))
        );
    }

    #[test]
    fn identity_range_covers_floor_and_ceil() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        let mapped = aspace
            .map_identity_range(
                &mut alloc,
                PhysicalAddress::new(0x0002_1234),
                PhysicalAddress::new(0x0002_5678),
                writable(),
                writable(),
            )
            .expect("identity map");
        // 0x21000..0x26000 is five pages.
        assert_eq!(mapped, 5);

        for probe in [0x0002_1234u32, 0x0002_1000, 0x0002_5677, 0x0002_5FFF] {
            let va = VirtualAddress::new(probe);
            assert_eq!(aspace.translate(va), Some(PhysicalAddress::new(probe)));
        }
        assert_eq!(aspace.translate(VirtualAddress::new(0x0002_0FFF)), None);
        assert_eq!(aspace.translate(VirtualAddress::new(0x0002_6000)), None);
    }

    #[test]
    fn identity_range_empty_maps_nothing() {
        let phys = TestPhys::with_frames(64);
        let mut alloc = BumpAlloc::new(0, 64 << 12);
        let aspace = space(&phys, &mut alloc);

        let mapped = aspace
            .map_identity_range(
                &mut alloc,
                PhysicalAddress::new(0x0002_0000),
                PhysicalAddress::new(0x0002_0000),
                writable(),
                writable(),
            )
            .expect("identity map");
        assert_eq!(mapped, 0);
    }
}
