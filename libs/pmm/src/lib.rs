//! # Physical memory manager
//!
//! Hands out whole [`minfo::PAGE_SIZE`] page frames to the rest of the kernel
//! (process pages, kernel stacks, page-table pages, pipe buffers).
//!
//! ## Per-CPU free lists
//!
//! Every CPU owns one free list. Allocation pops from the caller's list and
//! freeing pushes onto it, so CPUs rarely contend. Only when the local list
//! runs dry does [`PageAllocator::alloc`] visit the other lists in turn and
//! steal one frame, locking a single list at a time. Holding at most one list
//! lock is what keeps stealing deadlock-free.
//!
//! ## Frame table
//!
//! The lists are linked through a side table with one entry per managed page,
//! indexed by page number. Free memory is never reinterpreted as a link node,
//! and the table also records whether each frame is free, which is how a
//! double free is caught.
//!
//! ## Poisoning
//!
//! With the `poison` feature, frames are filled with [`ALLOC_JUNK`] when handed
//! out and [`FREE_JUNK`] when returned, so stale reads show up as garbage
//! instead of plausible data.

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

mod allocator;
mod frame;
mod stat;

use core::fmt;

pub use self::{allocator::PageAllocator, stat::Stat};

/// The byte pattern a frame is filled with right before it is handed out.
pub const ALLOC_JUNK: u8 = 5;

/// The byte pattern a frame is filled with when it is freed.
pub const FREE_JUNK: u8 = 1;

/// The kinds of allocation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Every free list in the system is empty.
    Exhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Exhausted => write!(f, "physical memory exhausted"),
        }
    }
}
