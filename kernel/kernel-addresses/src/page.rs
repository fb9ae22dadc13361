use crate::PageSize;
use core::fmt;
use core::marker::PhantomData;

/// An offset within one page of size `S`.
///
/// Always strictly less than `S::SIZE`; constructed by masking, so it cannot
/// go out of range.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageOffset<S: PageSize>(u32, PhantomData<S>);

impl<S: PageSize> PageOffset<S> {
    /// Keep only the in-page bits of `addr`.
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: u32) -> Self {
        Self(addr & (S::SIZE - 1), PhantomData)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl<S: PageSize> fmt::Debug for PageOffset<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+0x{:03X}/{}", self.0, S::as_str())
    }
}
