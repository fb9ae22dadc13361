use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// A lock-free single-producer single-consumer ring buffer.
///
/// Built for the interrupt-to-thread handoff: the interrupt handler is the
/// only producer and the kernel main loop the only consumer, so neither
/// side ever takes a lock and the handler can never spin against code it
/// interrupted.
///
/// One slot is sacrificed to distinguish full from empty, so a ring with
/// `N` slots holds at most `N - 1` items. When the ring is full the
/// **newest** item is dropped; everything already queued stays intact.
///
/// # Discipline
///
/// The SPSC contract is the caller's responsibility: at most one context
/// may call [`push`](Self::push) and at most one may call
/// [`pop`](Self::pop). The type is `Sync` so it can live in a `static`
/// shared between the handler and the main loop.
pub struct SpscRing<T, const N: usize> {
    /// Consumer cursor: next slot to read.
    head: AtomicUsize,
    /// Producer cursor: next slot to write.
    tail: AtomicUsize,
    slots: [UnsafeCell<MaybeUninit<T>>; N],
}

// Safety: producer and consumer touch disjoint slots; the cursors order
// the handoff via acquire/release pairs.
unsafe impl<T: Copy + Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T: Copy, const N: usize> SpscRing<T, N> {
    /// An empty ring.
    #[must_use]
    pub const fn new() -> Self {
        assert!(N >= 2, "a ring needs at least one usable slot");
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
        }
    }

    /// Maximum number of items the ring can hold.
    #[must_use]
    pub const fn capacity() -> usize {
        N - 1
    }

    /// Enqueue `value`. Returns `false` if the ring was full, in which case
    /// `value` is discarded (drop-newest).
    ///
    /// Producer side only.
    #[inline]
    pub fn push(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let next = (tail + 1) % N;
        if next == self.head.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `tail` is owned by the sole producer and the slot is not
        // visible to the consumer until the store below.
        unsafe {
            (*self.slots[tail].get()).write(value);
        }
        // Release publishes the slot write before the new tail.
        self.tail.store(next, Ordering::Release);
        true
    }

    /// Dequeue the oldest item, or `None` when empty.
    ///
    /// Consumer side only.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: the acquire load above pairs with the producer's release
        // store, so the slot holds an initialized value.
        let value = unsafe { (*self.slots[head].get()).assume_init_read() };
        self.head.store((head + 1) % N, Ordering::Release);
        Some(value)
    }

    /// Number of items currently queued.
    ///
    /// Racy by nature when the other side is active; exact when quiescent.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (tail + N - head) % N
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Copy, const N: usize> Default for SpscRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
