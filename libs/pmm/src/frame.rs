use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering::*};

const NIL: usize = usize::MAX;

/// The bookkeeping entry of one managed page frame.
///
/// `next` is only touched by whoever holds the lock of the list the frame is
/// on; `free` is flipped atomically so that racing frees of the same frame
/// cannot both succeed.
#[derive(Debug)]
pub(crate) struct Frame {
    next: AtomicUsize,
    free: AtomicBool,
}

static_assertions::assert_eq_size!(Frame, [usize; 2]);

impl Frame {
    pub const fn new() -> Self {
        Frame {
            next: AtomicUsize::new(NIL),
            free: AtomicBool::new(true),
        }
    }

    /// Mark the frame free, returning whether it already was.
    #[inline]
    pub fn release(&self) -> bool {
        self.free.swap(true, AcqRel)
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.free.load(Acquire)
    }
}

/// A singly linked stack of frame indices.
#[derive(Debug)]
pub(crate) struct FreeList {
    head: usize,
    len: usize,
}

impl FreeList {
    pub const fn new() -> Self {
        FreeList { head: NIL, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Push a frame that is marked free and on no list.
    pub fn push(&mut self, frames: &[Frame], index: usize) {
        let frame = &frames[index];
        debug_assert!(frame.is_free());
        frame.next.store(self.head, Relaxed);
        self.head = index;
        self.len += 1;
    }

    /// Pop a frame and mark it allocated.
    pub fn pop(&mut self, frames: &[Frame]) -> Option<usize> {
        if self.head == NIL {
            return None;
        }
        let index = self.head;
        let frame = &frames[index];
        self.head = frame.next.swap(NIL, Relaxed);
        self.len -= 1;

        let was_free = frame.free.swap(false, AcqRel);
        assert!(was_free, "kalloc: frame #{} on a free list is in use", index);
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    #[test]
    fn lifo_order() {
        let frames = (0..4).map(|_| Frame::new()).collect::<Vec<_>>();
        let mut list = FreeList::new();
        list.push(&frames, 2);
        list.push(&frames, 0);
        list.push(&frames, 3);
        assert_eq!(list.len(), 3);

        assert_eq!(list.pop(&frames), Some(3));
        assert!(!frames[3].is_free());
        assert_eq!(list.pop(&frames), Some(0));
        assert_eq!(list.pop(&frames), Some(2));
        assert_eq!(list.pop(&frames), None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn release_reports_double_free() {
        let frames = [Frame::new()];
        let mut list = FreeList::new();
        list.push(&frames, 0);
        assert_eq!(list.pop(&frames), Some(0));
        assert!(!frames[0].release());
        assert!(frames[0].release());
    }
}
