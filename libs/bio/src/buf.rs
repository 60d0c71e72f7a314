use core::{
    fmt,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    sync::atomic::Ordering::Acquire,
};

use sleeplock::{Sched, SleepLockGuard};

use crate::{
    cache::{Bcache, Buffer},
    BlockData, BlockId, Disk,
};

/// A locked, referenced cache buffer.
///
/// Only the task that got it may use it: [`Bcache::write`] and dropping it
/// are fatal anywhere else.
pub struct Buf<'a, S: Sched, D: Disk> {
    cache: &'a Bcache<S, D>,
    pub(crate) bucket: usize,
    pub(crate) slot: usize,
    id: BlockId,
    guard: ManuallyDrop<SleepLockGuard<'a, BlockData, S>>,
}

impl<'a, S: Sched, D: Disk> Buf<'a, S, D> {
    pub(crate) fn new(
        cache: &'a Bcache<S, D>,
        bucket: usize,
        slot: usize,
        id: BlockId,
        guard: SleepLockGuard<'a, BlockData, S>,
    ) -> Self {
        Buf {
            cache,
            bucket,
            slot,
            id,
            guard: ManuallyDrop::new(guard),
        }
    }

    pub(crate) fn buffer(&self) -> &'a Buffer<S> {
        self.cache.buffer(self.bucket, self.slot)
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn dev(&self) -> u32 {
        self.id.dev
    }

    #[inline]
    pub fn blockno(&self) -> u32 {
        self.id.blockno
    }

    /// Whether the payload holds the block's contents, as opposed to junk
    /// left by a previous block.
    pub fn is_valid(&self) -> bool {
        self.buffer().valid.load(Acquire)
    }

    /// Whether the calling task holds the buffer's sleep lock.
    pub fn holding(&self) -> bool {
        self.guard.holding()
    }
}

impl<S: Sched, D: Disk> Deref for Buf<'_, S, D> {
    type Target = BlockData;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<S: Sched, D: Disk> DerefMut for Buf<'_, S, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<S: Sched, D: Disk> Drop for Buf<'_, S, D> {
    fn drop(&mut self) {
        if !self.holding() {
            panic!(
                "brelse: {:?} is not held by task {}",
                self.id,
                S::current_id()
            );
        }
        // Unlock first so that a waiter keeps the block from being evicted.
        // SAFETY: The guard is not used afterwards.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.cache.put(self.bucket, self.slot, self.id, "brelse");
    }
}

impl<S: Sched, D: Disk> fmt::Debug for Buf<'_, S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buf")
            .field("id", &self.id)
            .field("bucket", &self.bucket)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

/// A reference that keeps a block cached without locking it.
///
/// Every pin must be given back to [`Bcache::unpin`] exactly once, which the
/// type enforces by being neither `Clone` nor `Copy`.
#[must_use = "a pin that is never unpinned keeps its buffer forever"]
#[derive(Debug)]
pub struct Pin {
    pub(crate) bucket: usize,
    pub(crate) slot: usize,
    pub(crate) id: BlockId,
}

static_assertions::assert_not_impl_any!(Pin: Clone, Copy);

impl Pin {
    pub(crate) fn new(bucket: usize, slot: usize, id: BlockId) -> Self {
        Pin { bucket, slot, id }
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }
}
