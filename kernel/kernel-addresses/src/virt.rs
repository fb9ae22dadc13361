use crate::{PageOffset, PageSize, align_down};
use core::fmt;
use core::marker::PhantomData;

/// Virtual (linear) memory address.
///
/// The twin of [`PhysicalAddress`](crate::PhysicalAddress) for the CPU's
/// linear address space. Translation between the two is the page tables'
/// job; this type only splits into a page base and an in-page offset.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u32);

impl VirtualAddress {
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
    pub const fn page<S: PageSize>(self) -> VirtualPage<S> {
        VirtualPage::from_addr(self)
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
    pub const fn split<S: PageSize>(self) -> (VirtualPage<S>, PageOffset<S>) {
        (self.page::<S>(), self.offset::<S>())
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:08X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for VirtualAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

/// Page-aligned base of a virtual page of size `S`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage<S: PageSize>(u32, PhantomData<S>);

impl<S: PageSize> VirtualPage<S> {
    /// The page containing `addr` (the low bits are truncated).
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: VirtualAddress) -> Self {
        Self(align_down(addr.as_u32(), S::SIZE), PhantomData)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress::new(self.0)
    }

    /// Recombine with an in-page offset into a full address.
    #[inline]
    #[must_use]
    pub const fn join(self, offset: PageOffset<S>) -> VirtualAddress {
        VirtualAddress::new(self.0 | offset.as_u32())
    }
}

impl<S: PageSize> fmt::Debug for VirtualPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VP{}(0x{:08X})", S::as_str(), self.0)
    }
}

impl<S: PageSize> fmt::Display for VirtualPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl<S: PageSize> From<VirtualPage<S>> for VirtualAddress {
    #[inline]
    fn from(p: VirtualPage<S>) -> Self {
        p.base()
    }
}
