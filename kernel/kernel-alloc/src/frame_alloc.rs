//! Bridge between the frame pool and the paging code.

use crate::free_list::FrameAllocator;
use kernel_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use kernel_vmem::FrameAlloc;

/// Adapter that lets the paging code pull page-table frames straight out of
/// a [`FrameAllocator`].
///
/// Frames obtained this way are owned by the page tables and never returned
/// to the pool.
pub struct PageTableFrames<'a>(pub &'a mut FrameAllocator);

impl FrameAlloc for PageTableFrames<'_> {
    fn alloc_frame(&mut self) -> Option<PhysicalPage<Size4K>> {
        let mut list = self.0.allocate(1).ok()?;
        let addr = list.pop()?;
        // Frame bases outside the 32-bit physical space cannot be entered
        // into a page table.
        let addr = u32::try_from(addr).ok()?;
        Some(PhysicalPage::from_addr(PhysicalAddress::new(addr)))
    }
}
