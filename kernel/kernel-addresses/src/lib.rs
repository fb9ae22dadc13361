//! # Typed 32-bit Memory Addresses
//!
//! Strongly typed wrappers for the raw addresses used by the paging and
//! frame-allocation code.
//!
//! ## Overview
//!
//! On a 32-bit machine both address spaces are plain `u32` values, which makes
//! it very easy to hand a physical frame base to something expecting a virtual
//! address (or the other way around). This crate keeps the two apart at
//! compile time while remaining a zero-cost wrapper:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] / [`PhysicalPage<S>`] | Physical memory (RAM, MMIO). |
//! | [`VirtualAddress`] / [`VirtualPage<S>`] | Page-table translated memory. |
//! | [`PageOffset<S>`] | An offset within one page of size `S`. |
//!
//! ## Page sizes
//!
//! Two granularities exist in two-level x86 paging, modeled as marker types
//! implementing [`PageSize`]:
//!
//! - [`Size4K`] — one page table entry (4096 bytes, the allocation unit).
//! - [`Size4M`] — the region covered by one page directory entry.
//!
//! ## Typical usage
//!
//! ```rust
//! # use kernel_addresses::*;
//! let pa = PhysicalAddress::new(0x0010_2042);
//! let (page, off) = pa.split::<Size4K>();
//! assert_eq!(page.base().as_u32() & (Size4K::SIZE - 1), 0);
//! assert_eq!(page.join(off), pa);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page;
mod page_size;
mod physical;
mod virt;

pub use page::PageOffset;
pub use page_size::{PageSize, Size4K, Size4M};
pub use physical::{PhysicalAddress, PhysicalPage};
pub use virt::{VirtualAddress, VirtualPage};

/// Align `x` down to the nearest multiple of `a`.
///
/// Returns the greatest `y <= x` with `y % a == 0`.
///
/// `a` must be non-zero and a power of two; the bit trick is meaningless
/// otherwise. No runtime checks are performed.
///
/// ```rust
/// # use kernel_addresses::align_down;
/// assert_eq!(align_down(0, 4096), 0);
/// assert_eq!(align_down(4095, 4096), 0);
/// assert_eq!(align_down(4096, 4096), 4096);
/// assert_eq!(align_down(0x12345, 16), 0x12340);
/// ```
#[inline]
#[must_use]
pub const fn align_down(x: u32, a: u32) -> u32 {
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// Returns the smallest `y >= x` with `y % a == 0`.
///
/// `a` must be non-zero and a power of two, and `x + (a - 1)` must not
/// overflow `u32` (debug builds panic on overflow).
///
/// ```rust
/// # use kernel_addresses::align_up;
/// assert_eq!(align_up(0, 4096), 0);
/// assert_eq!(align_up(1, 4096), 4096);
/// assert_eq!(align_up(4096, 4096), 4096);
/// assert_eq!(align_up(0x12345, 16), 0x12350);
/// ```
#[inline]
#[must_use]
pub const fn align_up(x: u32, a: u32) -> u32 {
    (x + a - 1) & !(a - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join_roundtrip() {
        let pa = PhysicalAddress::new(0x0010_2042);
        let (page, off) = pa.split::<Size4K>();
        assert_eq!(page.base().as_u32(), 0x0010_2000);
        assert_eq!(off.as_u32(), 0x042);
        assert_eq!(page.join(off), pa);
    }

    #[test]
    fn page_base_is_aligned() {
        let va = VirtualAddress::new(0xB8FF_FFFF);
        let page = va.page::<Size4M>();
        assert_eq!(page.base().as_u32() % Size4M::SIZE, 0);
        assert_eq!(page.base().as_u32(), 0xB8C0_0000);
    }

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_down(0x0010_0FFF, Size4K::SIZE), 0x0010_0000);
        assert_eq!(align_up(0x0010_0001, Size4K::SIZE), 0x0010_1000);
        // Already aligned values pass through unchanged.
        assert_eq!(align_down(0x0040_0000, Size4M::SIZE), 0x0040_0000);
        assert_eq!(align_up(0x0040_0000, Size4M::SIZE), 0x0040_0000);
    }

    #[test]
    fn physical_page_from_unaligned_addr_truncates() {
        let page = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x1234));
        assert_eq!(page.base().as_u32(), 0x1000);
    }
}
