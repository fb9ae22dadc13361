use crate::{PageOffset, PageSize, align_down};
use core::fmt;
use core::marker::PhantomData;

/// Physical memory address.
///
/// A thin wrapper around `u32` that denotes **physical** addresses (RAM or
/// memory-mapped device ranges). The type carries intent and prevents
/// accidental VA/PA mix-ups; it has no behavior of its own beyond splitting
/// into a page base and an in-page offset.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u32);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The page of size `S` containing this address.
    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> PhysicalPage<S> {
        PhysicalPage::from_addr(self)
    }

    /// The in-page offset of this address for page size `S`.
    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> PageOffset<S> {
        PageOffset::from_addr(self.0)
    }

    /// Decompose into page base and offset; `page.join(offset)` restores the
    /// original address.
    #[inline]
    #[must_use]
    pub const fn split<S: PageSize>(self) -> (PhysicalPage<S>, PageOffset<S>) {
        (self.page::<S>(), self.offset::<S>())
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:08X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for PhysicalAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

/// Page-aligned base of a physical page of size `S`.
///
/// Invariant: the low `S::SHIFT` bits of the base are always clear
/// (enforced by construction through [`from_addr`](Self::from_addr)).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize>(u32, PhantomData<S>);

impl<S: PageSize> PhysicalPage<S> {
    /// The page containing `addr` (the low bits are truncated).
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: PhysicalAddress) -> Self {
        Self(align_down(addr.as_u32(), S::SIZE), PhantomData)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0)
    }

    /// Recombine with an in-page offset into a full address.
    #[inline]
    #[must_use]
    pub const fn join(self, offset: PageOffset<S>) -> PhysicalAddress {
        PhysicalAddress::new(self.0 | offset.as_u32())
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PP{}(0x{:08X})", S::as_str(), self.0)
    }
}

impl<S: PageSize> fmt::Display for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl<S: PageSize> From<PhysicalPage<S>> for PhysicalAddress {
    #[inline]
    fn from(p: PhysicalPage<S>) -> Self {
        p.base()
    }
}
