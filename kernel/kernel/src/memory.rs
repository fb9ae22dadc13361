//! Boot-time memory bring-up: the physical frame pool and the identity
//! address space.
//!
//! The pool hands out 4 KiB frames from the region between the end of the
//! kernel image and the 16 MiB boundary. Paging identity-maps the kernel
//! image together with that whole pool (the free list threads through pool
//! frames, so they must stay reachable once translation is on), a margin
//! around the boot stack, and the VGA text buffer.

use kernel_alloc::FrameAllocator;
use kernel_sync::SpinLock;

#[cfg(target_arch = "x86")]
use core::sync::atomic::{AtomicU32, Ordering};
#[cfg(target_arch = "x86")]
use kernel_addresses::{PhysicalAddress, VirtualAddress, align_up};
#[cfg(target_arch = "x86")]
use kernel_alloc::{FRAME_SIZE, PageTableFrames};
#[cfg(target_arch = "x86")]
use kernel_vmem::{
    AddressSpace, IdentityMapper, MapError, PageEntryBits, RootPage, enable_paging,
};

/// Every frame the kernel can hand out.
pub static FRAME_POOL: SpinLock<FrameAllocator> = SpinLock::new(FrameAllocator::new());

/// Upper bound of the managed physical region (16 MiB).
pub const MANAGED_END: usize = 0x0100_0000;

/// Load address of the kernel image.
#[cfg(target_arch = "x86")]
const KERNEL_IMAGE_BASE: u32 = 0x0010_0000;

#[cfg(target_arch = "x86")]
const VGA_BASE: u32 = 0x000B_8000;
#[cfg(target_arch = "x86")]
const VGA_BYTES: u32 = 80 * 25 * 2;

#[cfg(target_arch = "x86")]
static IDENTITY: IdentityMapper = IdentityMapper;

/// Physical base of the live page directory; 0 until paging is up.
#[cfg(target_arch = "x86")]
static ROOT: AtomicU32 = AtomicU32::new(0);

#[cfg(target_arch = "x86")]
unsafe extern "C" {
    /// First byte past the kernel image, placed by the linker script.
    static __kernel_end: u8;
}

#[cfg(target_arch = "x86")]
fn kernel_end() -> u32 {
    // SAFETY: the symbol's address is meaningful even though its contents
    // are not; only the address is taken.
    let end = unsafe { &raw const __kernel_end };
    end as usize as u32
}

/// Seed the frame pool with everything between the kernel image and
/// [`MANAGED_END`].
///
/// # Safety
/// Call once, before any allocation, while that region is unused RAM.
#[cfg(target_arch = "x86")]
pub unsafe fn init_frame_pool() {
    let start = align_up(kernel_end(), FRAME_SIZE as u32) as usize;
    let mut pool = FRAME_POOL.lock();
    // SAFETY: the region above the image and below 16 MiB is ours alone.
    unsafe { pool.init(start, MANAGED_END) };
    log::info!(
        "pfa: managing {} frames in {start:#010X}..{MANAGED_END:#010X}",
        pool.free_frames()
    );
}

/// Build the identity address space and switch paging on.
///
/// # Errors
/// [`MapError::PageTableExhausted`] when the pool cannot supply page-table
/// frames; paging stays off in that case.
///
/// # Safety
/// Requires [`init_frame_pool`] to have run, and must execute on the boot
/// stack the mapping margin is computed from.
#[cfg(target_arch = "x86")]
pub unsafe fn init_paging() -> Result<(), MapError> {
    let rw = PageEntryBits::new().with_present(true).with_writable(true);
    let page = FRAME_SIZE as u32;

    let esp: u32;
    // SAFETY: reading ESP has no side effects.
    unsafe {
        core::arch::asm!("mov {}, esp", out(reg) esp, options(nomem, nostack, preserves_flags));
    }

    let mut pool = FRAME_POOL.lock();
    let mut frames = PageTableFrames(&mut *pool);
    let space = AddressSpace::new(&IDENTITY, &mut frames)?;

    // Kernel image plus the whole managed pool in one contiguous run.
    space.map_identity_range(
        &mut frames,
        PhysicalAddress::new(KERNEL_IMAGE_BASE),
        PhysicalAddress::new(MANAGED_END as u32),
        rw,
        rw,
    )?;

    // Margin around the boot stack: seven pages below ESP, one above.
    space.map_identity_range(
        &mut frames,
        PhysicalAddress::new(esp.saturating_sub(7 * page)),
        PhysicalAddress::new(esp.saturating_add(page)),
        rw,
        rw,
    )?;

    // VGA text buffer so the console keeps working.
    space.map_identity_range(
        &mut frames,
        PhysicalAddress::new(VGA_BASE),
        PhysicalAddress::new(VGA_BASE + VGA_BYTES),
        rw,
        rw,
    )?;

    let root = space.root_page();
    ROOT.store(root.base().as_u32(), Ordering::Release);
    drop(frames);
    drop(pool);

    // SAFETY: the ranges above cover the executing code, the stack and
    // every pool frame the kernel will touch.
    unsafe { enable_paging(root) };
    log::info!("paging: enabled, directory at {:?}", root.base());
    Ok(())
}

/// Handle to the live identity address space, once paging is on.
#[cfg(target_arch = "x86")]
#[must_use]
pub fn active_space() -> Option<AddressSpace<'static, IdentityMapper>> {
    let root = ROOT.load(Ordering::Acquire);
    if root == 0 {
        return None;
    }
    let root = RootPage::from_addr(PhysicalAddress::new(root));
    Some(AddressSpace::from_root(&IDENTITY, root))
}

/// Translate a virtual address through the live page tables.
#[cfg(target_arch = "x86")]
#[must_use]
pub fn translate(va: VirtualAddress) -> Option<PhysicalAddress> {
    active_space()?.translate(va)
}
