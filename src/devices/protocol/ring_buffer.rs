//! Lock free single producer, single consumer byte queue.
//!
//! The producer half lives in the receive interrupt and the consumer half
//! in the application loop. Neither half ever blocks: a full queue drops
//! the incoming byte and counts it, an empty queue yields `None`.
//!
//! Slots and indices are managed by [`heapless::spsc::Queue`]. The
//! producer publishes a slot with a `Release` store of the head index
//! after writing it, and the consumer frees it with a `Release` store of
//! the tail index after reading it; each side loads the other's index
//! with `Acquire`. Each index is written by exactly one side.
//!
//! The dropped byte counter follows the same rule: only the producer
//! stores it, and the consumer keeps the last value it has seen.
use core::sync::atomic::{AtomicUsize, Ordering};
use heapless::spsc::{self, Queue};

/// A byte that arrived while the queue was full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overflow(pub u8);

/// Circular byte queue with `N` slots, holding at most `N - 1` bytes.
pub struct RingBuffer<const N: usize> {
    queue: Queue<u8, N>,
    dropped: AtomicUsize,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self { Self { queue: Queue::new(), dropped: AtomicUsize::new(0) } }

    pub const fn capacity() -> usize { N - 1 }

    /// Splits the queue into its two halves. The exclusive borrow
    /// guarantees a single producer and a single consumer.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let dropped = &self.dropped;
        let dropped_seen = dropped.load(Ordering::Relaxed);
        let (producer, consumer) = self.queue.split();
        (Producer { inner: producer, dropped }, Consumer { inner: consumer, dropped, dropped_seen })
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self { Self::new() }
}

/// Writing half, owned by the receive interrupt.
pub struct Producer<'a, const N: usize> {
    inner: spsc::Producer<'a, u8, N>,
    dropped: &'a AtomicUsize,
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Appends a received byte. On a full queue the byte is discarded,
    /// counted, and nothing already queued is overwritten.
    pub fn ingest_byte(&mut self, byte: u8) -> Result<(), Overflow> {
        self.inner.enqueue(byte).map_err(|byte| {
            let dropped = self.dropped.load(Ordering::Relaxed);
            self.dropped.store(dropped.wrapping_add(1), Ordering::Relaxed);
            Overflow(byte)
        })
    }

    pub fn is_full(&self) -> bool { !self.inner.ready() }
}

/// Reading half, owned by the application loop.
pub struct Consumer<'a, const N: usize> {
    inner: spsc::Consumer<'a, u8, N>,
    dropped: &'a AtomicUsize,
    dropped_seen: usize,
}

impl<'a, const N: usize> Consumer<'a, N> {
    /// Pops the oldest byte, if any.
    pub fn dequeue(&mut self) -> Option<u8> { self.inner.dequeue() }

    pub fn is_empty(&self) -> bool { !self.inner.ready() }

    pub fn len(&self) -> usize { self.inner.len() }

    /// Bytes dropped by the producer since the last call.
    pub fn take_dropped(&mut self) -> usize {
        let dropped = self.dropped.load(Ordering::Relaxed);
        let fresh = dropped.wrapping_sub(self.dropped_seen);
        self.dropped_seen = dropped;
        fresh
    }
}
