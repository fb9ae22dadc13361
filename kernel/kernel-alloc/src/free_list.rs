use core::ptr::null_mut;
use thiserror::Error;

/// Size of one physical frame in bytes.
pub const FRAME_SIZE: usize = 4096;

/// Header stored at the beginning of every **free** frame.
///
/// Free frames carry their own bookkeeping: the first word of a free frame
/// is the link to the next free frame, so the allocator needs no side table.
///
/// ```text
/// +----------------------+-----------------------------+
/// | FrameNode (next ptr) |   rest of the 4 KiB frame   |
/// +----------------------+-----------------------------+
/// ^ frame base (4 KiB aligned)
/// ```
///
/// The moment a frame is handed out the header is dead memory and the owner
/// may overwrite all 4096 bytes.
#[repr(C)]
pub(crate) struct FrameNode {
    /// Pointer to the next free frame (or null).
    next: *mut FrameNode,
}

/// Failure modes of [`FrameAllocator::allocate`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum AllocError {
    /// [`FrameAllocator::init`] has not run yet.
    #[error("frame allocator not initialized")]
    Uninitialized,
    /// Fewer frames are free than were requested; nothing was allocated.
    #[error("requested {requested} frames but only {available} are free")]
    InsufficientFrames {
        /// Number of frames asked for.
        requested: usize,
        /// Number of frames that were free at the time.
        available: usize,
    },
}

/// An intrusive LIFO free-list allocator for 4 KiB physical frames.
///
/// # Invariants
/// - Every node on the list is the base of a distinct, frame-aligned 4 KiB
///   region inside the range given to [`init`](Self::init).
/// - `free` equals the length of the list; `total` never changes after init.
/// - Allocation is **all-or-nothing**: a request for `n` frames either
///   returns `n` frames or leaves the allocator untouched.
pub struct FrameAllocator {
    /// First free frame (or null).
    head: *mut FrameNode,
    /// Frames currently on the list.
    free: usize,
    /// Frames handed to [`init`](Self::init).
    total: usize,
    initialized: bool,
}

// Safety: used under SpinLock; raw pointers are only touched while locked.
unsafe impl Send for FrameAllocator {}

impl FrameAllocator {
    /// Construct an empty allocator (no frames yet).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: null_mut(),
            free: 0,
            total: 0,
            initialized: false,
        }
    }

    /// Indicates whether the allocator has been initialized.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of frames currently free.
    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.free
    }

    /// Number of frames managed in total.
    #[must_use]
    pub const fn total_frames(&self) -> usize {
        self.total
    }

    /// Initialize the allocator to manage `[start, end)`.
    ///
    /// `start` is aligned **up** and `end` **down** to frame bounds, so only
    /// whole frames fully inside the range are managed. A range smaller than
    /// one aligned frame yields an empty allocator.
    ///
    /// # Safety
    /// - The memory range must be **valid**, **writable**, and **exclusive**
    ///   to the allocator (frames are written while free).
    ///
    /// A second call is rejected and leaves the pool untouched.
    pub unsafe fn init(&mut self, start: usize, end: usize) {
        debug_assert!(!self.initialized, "frame allocator initialized twice");
        if self.initialized {
            return;
        }

        let first = start.wrapping_add(FRAME_SIZE - 1) & !(FRAME_SIZE - 1);
        let last = end & !(FRAME_SIZE - 1);

        let mut at = first;
        while at + FRAME_SIZE <= last {
            // SAFETY: `at` is a frame-aligned address inside the exclusive
            // range; writing the header is allowed.
            unsafe { self.push(at) };
            self.total += 1;
            at += FRAME_SIZE;
        }
        self.initialized = true;
    }

    /// Link the frame at `addr` onto the head of the list.
    ///
    /// # Safety
    /// `addr` must be the frame-aligned base of a valid, writable, unused
    /// frame within the managed range.
    unsafe fn push(&mut self, addr: usize) {
        let node = addr as *mut FrameNode;
        unsafe {
            (*node).next = self.head;
        }
        self.head = node;
        self.free += 1;
    }

    /// Unlink and return the head frame's base address.
    fn pop(&mut self) -> Option<usize> {
        if self.head.is_null() {
            return None;
        }
        let node = self.head;
        // SAFETY: non-null list nodes are valid free-frame headers.
        self.head = unsafe { (*node).next };
        self.free -= 1;
        Some(node as usize)
    }

    /// Allocate exactly `count` frames.
    ///
    /// On success the returned [`FrameList`] owns `count` frames. On failure
    /// the allocator state is unchanged. `count == 0` succeeds with an empty
    /// list.
    ///
    /// # Errors
    /// - [`AllocError::Uninitialized`] before [`init`](Self::init).
    /// - [`AllocError::InsufficientFrames`] if fewer than `count` frames are
    ///   free.
    pub fn allocate(&mut self, count: usize) -> Result<FrameList, AllocError> {
        if !self.initialized {
            return Err(AllocError::Uninitialized);
        }
        if count > self.free {
            return Err(AllocError::InsufficientFrames {
                requested: count,
                available: self.free,
            });
        }

        let mut list = FrameList::empty();
        for _ in 0..count {
            // Cannot fail: the length check above guarantees enough nodes.
            if let Some(addr) = self.pop() {
                // SAFETY: `addr` came off the free list and is now owned by
                // the caller via `list`.
                unsafe { list.push(addr) };
            }
        }
        Ok(list)
    }

    /// Iterate over the base addresses of all free frames, newest first.
    ///
    /// Only meaningful while the allocator is quiescent (caller holds the
    /// lock around it).
    pub fn free_addresses(&self) -> impl Iterator<Item = usize> + '_ {
        let mut at = self.head;
        core::iter::from_fn(move || {
            if at.is_null() {
                return None;
            }
            let addr = at as usize;
            // SAFETY: list nodes are valid free-frame headers.
            at = unsafe { (*at).next };
            Some(addr)
        })
    }

    /// Return every frame in `list` to the free pool.
    ///
    /// # Safety
    /// The frames must have come from [`allocate`](Self::allocate) on this
    /// instance and must no longer be referenced by the caller.
    pub unsafe fn free(&mut self, mut list: FrameList) {
        while let Some(addr) = list.pop() {
            // SAFETY: ownership of the frame returns to the list.
            unsafe { self.push(addr) };
        }
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A batch of frames carved off the allocator, linked through their own
/// headers.
///
/// Dropping a non-empty list leaks its frames; hand it back to
/// [`FrameAllocator::free`] instead.
#[derive(Debug, Eq, PartialEq)]
pub struct FrameList {
    head: *mut FrameNode,
    len: usize,
}

// Safety: same story as FrameAllocator; access is serialized by the owner.
unsafe impl Send for FrameList {}

impl FrameList {
    /// A list owning no frames.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            head: null_mut(),
            len: 0,
        }
    }

    /// Number of frames on the list.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Link the frame at `addr` onto the head of the list.
    ///
    /// # Safety
    /// `addr` must be the frame-aligned base of a frame owned by this list
    /// from now on.
    pub(crate) unsafe fn push(&mut self, addr: usize) {
        let node = addr as *mut FrameNode;
        unsafe {
            (*node).next = self.head;
        }
        self.head = node;
        self.len += 1;
    }

    /// Detach and return the base address of the first frame.
    ///
    /// The caller takes ownership of the frame and may use all 4096 bytes.
    pub fn pop(&mut self) -> Option<usize> {
        if self.head.is_null() {
            return None;
        }
        let node = self.head;
        // SAFETY: non-null list nodes are valid free-frame headers.
        self.head = unsafe { (*node).next };
        self.len -= 1;
        Some(node as usize)
    }

    /// Iterate over the base addresses without giving up ownership.
    pub fn addresses(&self) -> impl Iterator<Item = usize> + '_ {
        let mut at = self.head;
        core::iter::from_fn(move || {
            if at.is_null() {
                return None;
            }
            let addr = at as usize;
            // SAFETY: list nodes are valid free-frame headers.
            at = unsafe { (*at).next };
            Some(addr)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::vec::Vec;

    #[repr(align(4096))]
    struct Aligned4K([u8; 4096]);

    /// Simulated physical memory: `n` contiguous-enough frames the allocator
    /// may scribble on.
    struct Arena {
        frames: Vec<Aligned4K>,
    }

    impl Arena {
        fn with_frames(n: usize) -> Self {
            let mut frames = Vec::with_capacity(n);
            for _ in 0..n {
                frames.push(Aligned4K([0; 4096]));
            }
            Self { frames }
        }

        fn start(&self) -> usize {
            self.frames.as_ptr() as usize
        }

        fn end(&self) -> usize {
            self.start() + self.frames.len() * FRAME_SIZE
        }

        fn allocator(&self) -> FrameAllocator {
            let mut alloc = FrameAllocator::new();
            unsafe { alloc.init(self.start(), self.end()) };
            alloc
        }
    }

    #[test]
    fn init_carves_whole_frames_only() {
        let arena = Arena::with_frames(16);
        let alloc = arena.allocator();
        assert!(alloc.is_initialized());
        assert_eq!(alloc.total_frames(), 16);
        assert_eq!(alloc.free_frames(), 16);

        // Shave a byte off both ends: the two boundary frames are no longer
        // fully inside the range and must be skipped.
        let mut trimmed = FrameAllocator::new();
        unsafe { trimmed.init(arena.start() + 1, arena.end() - 1) };
        assert_eq!(trimmed.total_frames(), 14);
    }

    #[test]
    fn allocate_before_init_fails() {
        let mut alloc = FrameAllocator::new();
        assert_eq!(alloc.allocate(1), Err(AllocError::Uninitialized));
    }

    #[test]
    fn allocate_is_all_or_nothing() {
        let arena = Arena::with_frames(8);
        let mut alloc = arena.allocator();

        let err = alloc.allocate(9).expect_err("more than the pool holds");
        assert_eq!(
            err,
            AllocError::InsufficientFrames {
                requested: 9,
                available: 8
            }
        );
        // The failed request must not have consumed anything.
        assert_eq!(alloc.free_frames(), 8);

        let all = alloc.allocate(8).expect("exactly the pool");
        assert_eq!(all.len(), 8);
        assert_eq!(alloc.free_frames(), 0);
        unsafe { alloc.free(all) };
    }

    #[test]
    fn oversized_request_then_exact_drain_then_partial_refill() {
        let arena = Arena::with_frames(16);
        let mut alloc = arena.allocator();

        assert_eq!(
            alloc.allocate(20),
            Err(AllocError::InsufficientFrames {
                requested: 20,
                available: 16
            })
        );

        let mut all = alloc.allocate(16).expect("the whole pool");
        assert_eq!(alloc.free_frames(), 0);

        // Hand four frames back and they are immediately reusable.
        let mut four = FrameList::empty();
        for _ in 0..4 {
            let addr = all.pop().expect("frame");
            unsafe { four.push(addr) };
        }
        unsafe { alloc.free(four) };
        assert_eq!(alloc.free_frames(), 4);

        let again = alloc.allocate(4).expect("the returned frames");
        assert_eq!(again.len(), 4);
        assert_eq!(alloc.free_frames(), 0);
    }

    #[test]
    fn allocated_frames_are_unique_aligned_and_in_range() {
        let arena = Arena::with_frames(16);
        let mut alloc = arena.allocator();

        let list = alloc.allocate(10).expect("allocate");
        let addrs: BTreeSet<usize> = list.addresses().collect();
        assert_eq!(addrs.len(), 10);
        for &addr in &addrs {
            assert_eq!(addr % FRAME_SIZE, 0);
            assert!(addr >= arena.start());
            assert!(addr + FRAME_SIZE <= arena.end());
        }
        unsafe { alloc.free(list) };
    }

    #[test]
    fn free_returns_frames_to_the_pool() {
        let arena = Arena::with_frames(4);
        let mut alloc = arena.allocator();

        let list = alloc.allocate(4).expect("drain the pool");
        assert_eq!(alloc.free_frames(), 0);
        assert_eq!(
            alloc.allocate(1),
            Err(AllocError::InsufficientFrames {
                requested: 1,
                available: 0
            })
        );

        unsafe { alloc.free(list) };
        assert_eq!(alloc.free_frames(), 4);

        let again = alloc.allocate(4).expect("pool refilled");
        assert_eq!(again.len(), 4);
    }

    #[test]
    fn free_addresses_walks_the_whole_list() {
        let arena = Arena::with_frames(6);
        let mut alloc = arena.allocator();

        let walked: Vec<usize> = alloc.free_addresses().collect();
        assert_eq!(walked.len(), 6);
        assert_eq!(walked.len(), alloc.free_frames());
        for addr in &walked {
            assert_eq!(addr % FRAME_SIZE, 0);
        }

        let taken = alloc.allocate(2).expect("two frames");
        assert_eq!(alloc.free_addresses().count(), 4);
        unsafe { alloc.free(taken) };
        assert_eq!(alloc.free_addresses().count(), 6);
    }

    #[test]
    fn allocate_zero_is_a_noop() {
        let arena = Arena::with_frames(2);
        let mut alloc = arena.allocator();

        let list = alloc.allocate(0).expect("empty request");
        assert!(list.is_empty());
        assert_eq!(alloc.free_frames(), 2);
        unsafe { alloc.free(list) };
    }

    #[test]
    fn frame_contents_survive_the_list_walk() {
        let arena = Arena::with_frames(4);
        let mut alloc = arena.allocator();

        let mut list = alloc.allocate(2).expect("allocate");
        let first = list.pop().expect("one frame");
        // Owner may use the full frame, including the old header bytes.
        unsafe { core::ptr::write_bytes(first as *mut u8, 0xA5, FRAME_SIZE) };

        unsafe { alloc.free(list) };
        let mut single = FrameList::empty();
        unsafe { single.push(first) };
        unsafe { alloc.free(single) };
        assert_eq!(alloc.free_frames(), 4);
    }
}
