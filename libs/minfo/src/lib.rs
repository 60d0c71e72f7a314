#![no_std]

mod addr;

pub use self::addr::{LAddr, PAddr};

pub const PAGE_SHIFT: usize = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// The maximum number of CPU cores the kernel manages.
pub const NCPU: usize = 8;

/// The size of a disk block, which is also the payload size of a cached
/// buffer.
pub const BSIZE: usize = 1024;

/// The maximum number of blocks any file-system operation writes.
pub const MAXOPBLOCKS: usize = 10;

/// The total number of buffers the block cache is provisioned for.
pub const NBUF: usize = MAXOPBLOCKS * 3;

/// The default number of hash buckets of the block cache.
pub const NR_BUCKETS: usize = 13;

static_assertions::const_assert!(PAGE_SIZE % BSIZE == 0);
static_assertions::const_assert!(NCPU > 0 && NR_BUCKETS > 0);

/// Round `addr` up to the next page boundary.
#[inline]
pub const fn page_round_up(addr: usize) -> usize {
    (addr + PAGE_MASK) & !PAGE_MASK
}

/// Round `addr` down to its page boundary.
#[inline]
pub const fn page_round_down(addr: usize) -> usize {
    addr & !PAGE_MASK
}
