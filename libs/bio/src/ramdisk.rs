use alloc::{boxed::Box, collections::BTreeMap};
use core::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use spin::Mutex;

use crate::{BlockData, BlockId, Disk, BSIZE};

/// A disk kept entirely in memory.
///
/// Blocks never written read back as zeros. Every transfer is counted, which
/// makes it easy to tell whether the cache went to the disk or not.
#[derive(Debug, Default)]
pub struct RamDisk {
    blocks: Mutex<BTreeMap<BlockId, Box<BlockData>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl RamDisk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `data` on the disk directly, bypassing any cache.
    pub fn store(&self, block: BlockId, data: &BlockData) {
        let mut blocks = self.blocks.lock();
        **blocks
            .entry(block)
            .or_insert_with(|| Box::new([0; BSIZE])) = *data;
    }

    /// A copy of what the disk holds for `block`.
    pub fn load(&self, block: BlockId) -> BlockData {
        let blocks = self.blocks.lock();
        blocks.get(&block).map_or([0; BSIZE], |data| **data)
    }

    /// The number of blocks read so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Relaxed)
    }

    /// The number of blocks written so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Relaxed)
    }
}

impl Disk for RamDisk {
    fn rw(&self, block: BlockId, data: &mut BlockData, write: bool) {
        if write {
            self.store(block, data);
            self.writes.fetch_add(1, Relaxed);
        } else {
            *data = self.load(block);
            self.reads.fetch_add(1, Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_blocks_are_zero() {
        let disk = RamDisk::new();
        let mut data = [0xff; BSIZE];
        disk.rw(BlockId::new(1, 9), &mut data, false);
        assert!(data.iter().all(|&b| b == 0));
        assert_eq!((disk.reads(), disk.writes()), (1, 0));
    }

    #[test]
    fn blocks_are_independent() {
        let disk = RamDisk::new();
        let mut data = [7; BSIZE];
        disk.rw(BlockId::new(1, 2), &mut data, true);
        data = [8; BSIZE];
        disk.rw(BlockId::new(2, 2), &mut data, true);

        assert_eq!(disk.load(BlockId::new(1, 2)), [7; BSIZE]);
        assert_eq!(disk.load(BlockId::new(2, 2)), [8; BSIZE]);
        assert_eq!(disk.writes(), 2);
    }
}
