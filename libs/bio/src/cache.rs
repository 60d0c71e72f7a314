use alloc::boxed::Box;
use core::{
    hash::Hasher,
    sync::atomic::{AtomicBool, Ordering::*},
};

use archop::IntrMutex;
use minfo::{NBUF, NR_BUCKETS};
use sleeplock::{Sched, SleepLock};

use crate::{
    buf::{Buf, Pin},
    hash::FnvHasher,
    stat::{Counters, Stat},
    BlockData, BlockId, Disk, BSIZE,
};

/// The shape of the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// The number of hash buckets.
    pub nr_buckets: usize,
    /// The number of buffers in every bucket.
    pub bucket_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nr_buckets: NR_BUCKETS,
            bucket_cap: NBUF.div_ceil(NR_BUCKETS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Slot {
    key: Option<BlockId>,
    refcnt: usize,
}

pub(crate) struct Buffer<S: Sched> {
    /// Whether `data` holds the block's contents.
    pub valid: AtomicBool,
    pub data: SleepLock<BlockData, S>,
}

struct Bucket<S: Sched> {
    slots: IntrMutex<Box<[Slot]>, S>,
    bufs: Box<[Buffer<S>]>,
}

impl<S: Sched> Bucket<S> {
    fn new(cap: usize) -> Self {
        Bucket {
            slots: IntrMutex::new((0..cap).map(|_| Slot::default()).collect()),
            bufs: (0..cap)
                .map(|_| Buffer {
                    valid: AtomicBool::new(false),
                    data: SleepLock::new([0; BSIZE], "buffer"),
                })
                .collect(),
        }
    }
}

/// The block buffer cache.
///
/// See [the crate level doc](crate) for the design.
pub struct Bcache<S: Sched, D: Disk> {
    buckets: Box<[Bucket<S>]>,
    disk: D,
    config: Config,
    counters: Counters,
}

impl<S: Sched, D: Disk> Bcache<S, D> {
    /// Create a cache with the default shape on top of `disk`.
    pub fn new(disk: D) -> Self {
        Self::with_config(disk, Config::default())
    }

    /// # Panics
    ///
    /// If the configuration has no buckets or no buffers per bucket.
    pub fn with_config(disk: D, config: Config) -> Self {
        assert!(
            config.nr_buckets > 0 && config.bucket_cap > 0,
            "binit: empty buffer pool {:?}",
            config
        );

        let buckets = (0..config.nr_buckets)
            .map(|_| Bucket::new(config.bucket_cap))
            .collect();
        log::info!(
            "binit: {} buckets of {} buffers",
            config.nr_buckets,
            config.bucket_cap
        );
        Bcache {
            buckets,
            disk,
            config,
            counters: Counters::default(),
        }
    }

    /// The bucket that block `blockno` of `dev` is cached in.
    pub fn bucket_of(&self, dev: u32, blockno: u32) -> usize {
        let mut hasher = FnvHasher::default();
        hasher.write_u32(dev);
        hasher.write_u32(blockno);
        (hasher.finish() % self.buckets.len() as u64) as usize
    }

    /// Look up a block, binding a free buffer to it on a miss, and lock it.
    ///
    /// The payload is not read from the disk; check [`Buf::is_valid`] or use
    /// [`Bcache::read`] instead.
    ///
    /// # Panics
    ///
    /// If the block is not cached and every buffer of its bucket is in use.
    pub fn get(&self, dev: u32, blockno: u32) -> Buf<'_, S, D> {
        let id = BlockId::new(dev, blockno);
        let bucket = self.bucket_of(dev, blockno);
        let mut slots = self.buckets[bucket].slots.lock();

        if let Some(slot) = slots.iter().position(|s| s.key == Some(id)) {
            slots[slot].refcnt += 1;
            drop(slots);
            self.counters.hit();

            let guard = self.buffer(bucket, slot).data.lock();
            return Buf::new(self, bucket, slot, id, guard);
        }

        let slot = match slots.iter().position(|s| s.refcnt == 0) {
            Some(slot) => slot,
            None => {
                drop(slots);
                panic!("bget: no buffers in bucket #{} for {:?}", bucket, id);
            }
        };
        slots[slot] = Slot {
            key: Some(id),
            refcnt: 1,
        };
        self.buffer(bucket, slot).valid.store(false, Release);
        drop(slots);
        self.counters.miss();
        log::trace!("bget: {:?} bound to bucket #{} slot {}", id, bucket, slot);

        let buffer = self.buffer(bucket, slot);
        let mut guard = buffer.data.lock();
        // A hit may have taken the lock first and filled the payload already.
        if !buffer.valid.load(Acquire) {
            fill_junk(&mut guard);
        }
        Buf::new(self, bucket, slot, id, guard)
    }

    /// Get a locked buffer holding the contents of block `blockno` of `dev`.
    pub fn read(&self, dev: u32, blockno: u32) -> Buf<'_, S, D> {
        let mut buf = self.get(dev, blockno);
        if !buf.is_valid() {
            let id = buf.id();
            self.disk.rw(id, &mut buf, false);
            buf.buffer().valid.store(true, Release);
            self.counters.disk_read();
        }
        buf
    }

    /// Write the buffer's payload back to the disk.
    ///
    /// # Panics
    ///
    /// If the calling task does not hold the buffer.
    pub fn write(&self, buf: &mut Buf<'_, S, D>) {
        if !buf.holding() {
            panic!(
                "bwrite: {:?} is not held by task {}",
                buf.id(),
                S::current_id()
            );
        }
        let id = buf.id();
        self.disk.rw(id, buf, true);
        self.counters.disk_write();
    }

    /// Unlock the buffer and drop its reference. Same as dropping `buf`.
    ///
    /// # Panics
    ///
    /// If the calling task does not hold the buffer.
    #[inline]
    pub fn release(&self, buf: Buf<'_, S, D>) {
        drop(buf)
    }

    /// Keep the buffer's block cached after `buf` is released, until the
    /// returned token is handed to [`Bcache::unpin`].
    pub fn pin(&self, buf: &Buf<'_, S, D>) -> Pin {
        let mut slots = self.buckets[buf.bucket].slots.lock();
        let slot = &mut slots[buf.slot];
        debug_assert_eq!(slot.key, Some(buf.id()));
        slot.refcnt += 1;
        Pin::new(buf.bucket, buf.slot, buf.id())
    }

    /// # Panics
    ///
    /// If the pinned block is no longer referenced, which can only happen
    /// when `pin` came from another cache.
    pub fn unpin(&self, pin: Pin) {
        self.put(pin.bucket, pin.slot, pin.id, "bunpin");
    }

    /// Drop one reference to a slot, forgetting its block at the last one.
    pub(crate) fn put(&self, bucket: usize, slot: usize, id: BlockId, op: &str) {
        let mut slots = self.buckets[bucket].slots.lock();
        let entry = &mut slots[slot];
        if entry.key != Some(id) || entry.refcnt == 0 {
            panic!("{}: removing absent entry {:?}", op, id);
        }

        entry.refcnt -= 1;
        if entry.refcnt == 0 {
            entry.key = None;
            self.buffer(bucket, slot).valid.store(false, Release);
            self.counters.evict();
            log::trace!("{}: {:?} evicted from bucket #{}", op, id, bucket);
        }
    }

    pub(crate) fn buffer(&self, bucket: usize, slot: usize) -> &Buffer<S> {
        &self.buckets[bucket].bufs[slot]
    }

    /// The number of references to a block, 0 if it is not cached.
    pub fn refcnt(&self, dev: u32, blockno: u32) -> usize {
        let id = BlockId::new(dev, blockno);
        let slots = self.buckets[self.bucket_of(dev, blockno)].slots.lock();
        slots
            .iter()
            .find(|s| s.key == Some(id))
            .map_or(0, |s| s.refcnt)
    }

    pub fn is_cached(&self, dev: u32, blockno: u32) -> bool {
        self.refcnt(dev, blockno) > 0
    }

    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    #[inline]
    pub fn nr_bufs(&self) -> usize {
        self.config.nr_buckets * self.config.bucket_cap
    }

    #[inline]
    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn stat(&self) -> Stat {
        self.counters.snapshot(self.nr_bufs())
    }
}

fn fill_junk(data: &mut BlockData) {
    cfg_if::cfg_if! {
        if #[cfg(feature = "poison")] {
            data.fill(crate::RECLAIM_JUNK);
        } else {
            let _ = data;
        }
    }
}
