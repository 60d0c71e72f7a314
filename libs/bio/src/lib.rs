//! # Block buffer cache
//!
//! Keeps in-memory copies of disk blocks so that the file system can share
//! them between tasks and avoid repeated disk transfers.
//!
//! ## Buckets
//!
//! The buffer pool is split into buckets by a hash of the block identity. Each
//! bucket owns a fixed number of buffer slots and a slot table under its own
//! [`archop::IntrMutex`], so lookups of blocks in different buckets never
//! contend. No operation ever holds two bucket locks.
//!
//! ## Two locks per buffer
//!
//! The bucket lock only covers a slot's identity and reference count, and is
//! never held across disk I/O. The payload is covered by a
//! [`sleeplock::SleepLock`] that a [`Buf`] holds for as long as it lives, so
//! a task waiting for a block in use by another sleeps instead of spinning.
//!
//! ## Eviction
//!
//! A slot forgets its block as soon as the last reference goes away, be it a
//! [`Buf`] or a [`Pin`]. Blocks are therefore only shared between concurrent
//! users, and a block read again later always comes from the disk.

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

mod buf;
mod cache;
mod hash;
mod ramdisk;
mod stat;

use core::fmt;

pub use minfo::BSIZE;

pub use self::{
    buf::{Buf, Pin},
    cache::{Bcache, Config},
    ramdisk::RamDisk,
    stat::Stat,
};

/// The byte pattern a reclaimed buffer is filled with before its new block is
/// read in.
pub const RECLAIM_JUNK: u8 = 0x0c;

/// The payload of one buffer.
pub type BlockData = [u8; BSIZE];

/// The identity of a disk block.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId {
    pub dev: u32,
    pub blockno: u32,
}

impl BlockId {
    #[inline]
    pub const fn new(dev: u32, blockno: u32) -> Self {
        BlockId { dev, blockno }
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({}:{})", self.dev, self.blockno)
    }
}

/// The disk driver the cache reads from and writes back to.
///
/// The transfer is synchronous: when `rw` returns, `data` holds the block's
/// contents (reads) or the disk holds `data` (writes). The caller always holds
/// the buffer's sleep lock, so implementations may block.
pub trait Disk: Sync {
    fn rw(&self, block: BlockId, data: &mut BlockData, write: bool);
}

impl<D: Disk + ?Sized> Disk for &D {
    #[inline]
    fn rw(&self, block: BlockId, data: &mut BlockData, write: bool) {
        (**self).rw(block, data, write)
    }
}
