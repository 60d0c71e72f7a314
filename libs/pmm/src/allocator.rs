use alloc::boxed::Box;
use core::ops::Range;

use archop::{Arch, IntrMutex, IntrState};
use array_macro::array;
use minfo::{PAddr, NCPU, PAGE_SHIFT, PAGE_SIZE};

use crate::{
    frame::{Frame, FreeList},
    stat::{Counters, Stat},
    Error,
};

/// The per-CPU page frame allocator.
///
/// See [the crate level doc](crate) for the design.
pub struct PageAllocator<A: Arch> {
    /// The first managed frame.
    base: PAddr,
    /// The end of the last managed frame.
    end: PAddr,
    id_off: usize,
    nr_cpus: usize,
    frames: Box<[Frame]>,
    lists: [IntrMutex<FreeList, A>; NCPU],
    counters: Counters,
}

impl<A: Arch> PageAllocator<A> {
    /// Take over every whole page in `kernel_end..phys_top` and spread the
    /// frames over the free lists of the first `nr_cpus` CPUs, in contiguous
    /// chunks of near-equal size.
    ///
    /// # Safety
    ///
    /// The range must be unused by anything else, and mapped at `id_off`
    /// bytes above its physical address for the lifetime of the allocator.
    ///
    /// # Panics
    ///
    /// If `nr_cpus` is 0 or greater than [`NCPU`].
    pub unsafe fn new(kernel_end: PAddr, phys_top: PAddr, id_off: usize, nr_cpus: usize) -> Self {
        assert!(
            (1..=NCPU).contains(&nr_cpus),
            "kinit: {} CPUs requested, at most {} supported",
            nr_cpus,
            NCPU
        );

        let base = kernel_end.page_round_up();
        let nr_frames = phys_top.saturating_sub(*base) >> PAGE_SHIFT;
        let end = base + (nr_frames << PAGE_SHIFT);

        let mut pmm = PageAllocator {
            base,
            end,
            id_off,
            nr_cpus,
            frames: (0..nr_frames).map(|_| Frame::new()).collect(),
            lists: array![_ => IntrMutex::new(FreeList::new()); NCPU],
            counters: Counters::new(),
        };

        // Backwards, so that each list hands out its lowest frame first.
        for index in (0..nr_frames).rev() {
            pmm.fill(index, crate::FREE_JUNK);
            let cpu = index * nr_cpus / nr_frames;
            pmm.lists[cpu].get_mut().push(&pmm.frames, index);
        }

        log::info!(
            "kinit: {} frames in {:?}..{:?} over {} CPUs",
            nr_frames,
            base,
            end,
            nr_cpus
        );
        pmm
    }

    /// Allocate one page frame.
    ///
    /// The local free list is tried first, then every other CPU's list in
    /// turn. [`Error::Exhausted`] means all of them came up empty.
    pub fn alloc(&self) -> Result<PAddr, Error> {
        let index = {
            let intr = IntrState::<A>::lock();
            let cpu = self.cpu(&intr);
            let local = self.lists[cpu].lock().pop(&self.frames);
            local.or_else(|| self.steal(cpu))
        };

        let index = match index {
            Some(index) => index,
            None => {
                log::warn!("kalloc: out of physical memory");
                return Err(Error::Exhausted);
            }
        };

        self.counters.alloc();
        self.fill(index, crate::ALLOC_JUNK);
        Ok(self.paddr(index))
    }

    /// Take one frame from another CPU's list, locking only one list at a
    /// time.
    fn steal(&self, cpu: usize) -> Option<usize> {
        (1..self.nr_cpus)
            .map(|off| (cpu + off) % self.nr_cpus)
            .find_map(|victim| {
                let index = self.lists[victim].lock().pop(&self.frames)?;
                log::trace!(
                    "kalloc: CPU #{} stole {:?} from CPU #{}",
                    cpu,
                    self.paddr(index),
                    victim
                );
                self.counters.steal();
                Some(index)
            })
    }

    /// Return a frame to the calling CPU's free list.
    ///
    /// # Safety
    ///
    /// The caller must not touch the frame afterwards.
    ///
    /// # Panics
    ///
    /// If `paddr` is misaligned, outside the managed range, or already free.
    /// Any of these means the caller's bookkeeping is corrupted.
    pub unsafe fn free(&self, paddr: PAddr) {
        let index = match self.index_of(paddr) {
            Some(index) => index,
            None => panic!("kfree: {:?} is not a managed frame", paddr),
        };
        if self.frames[index].release() {
            panic!("kfree: double free of {:?}", paddr);
        }
        self.fill(index, crate::FREE_JUNK);

        let intr = IntrState::<A>::lock();
        let cpu = self.cpu(&intr);
        self.lists[cpu].lock().push(&self.frames, index);
        drop(intr);

        self.counters.free();
    }

    fn cpu(&self, intr: &IntrState<A>) -> usize {
        let cpu = intr.cpu_id();
        assert!(cpu < self.nr_cpus, "kalloc: CPU #{} is not managed", cpu);
        cpu
    }

    #[inline]
    fn paddr(&self, index: usize) -> PAddr {
        self.base + (index << PAGE_SHIFT)
    }

    fn index_of(&self, paddr: PAddr) -> Option<usize> {
        (paddr.is_page_aligned() && self.contains(paddr)).then(|| (*paddr - *self.base) >> PAGE_SHIFT)
    }

    fn fill(&self, index: usize, junk: u8) {
        cfg_if::cfg_if! {
            if #[cfg(feature = "poison")] {
                let laddr = self.paddr(index).to_laddr(self.id_off);
                // SAFETY: The frame is managed and owned by nobody right now.
                unsafe { laddr.write_bytes(junk, PAGE_SIZE) };
            } else {
                let _ = (index, junk);
            }
        }
    }

    /// Whether `paddr` lies in one of the managed frames.
    #[inline]
    pub fn contains(&self, paddr: PAddr) -> bool {
        self.range().contains(&paddr)
    }

    #[inline]
    pub fn range(&self) -> Range<PAddr> {
        self.base..self.end
    }

    #[inline]
    pub fn nr_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn nr_cpus(&self) -> usize {
        self.nr_cpus
    }

    /// The number of free frames on `cpu`'s list.
    pub fn free_count_of(&self, cpu: usize) -> usize {
        self.lists[cpu].lock().len()
    }

    /// The number of free frames system-wide.
    ///
    /// The lists are visited one at a time, so under concurrent use the sum
    /// is only a close estimate.
    pub fn free_count(&self) -> usize {
        (0..self.nr_cpus).map(|cpu| self.free_count_of(cpu)).sum()
    }

    pub fn stat(&self) -> Stat {
        self.counters.snapshot(self.nr_frames())
    }
}
