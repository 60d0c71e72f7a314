use core::{
    fmt::Display,
    sync::atomic::{AtomicUsize, Ordering::Relaxed},
};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    allocs: AtomicUsize,
    frees: AtomicUsize,
    steals: AtomicUsize,
}

impl Counters {
    pub const fn new() -> Self {
        Counters {
            allocs: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            steals: AtomicUsize::new(0),
        }
    }

    pub fn alloc(&self) {
        self.allocs.fetch_add(1, Relaxed);
    }

    pub fn free(&self) {
        self.frees.fetch_add(1, Relaxed);
    }

    pub fn steal(&self) {
        self.steals.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self, capacity: usize) -> Stat {
        let alloc_cnt = self.allocs.load(Relaxed);
        let free_cnt = self.frees.load(Relaxed);
        Stat {
            capacity,
            alloc_cnt,
            free_cnt,
            steal_cnt: self.steals.load(Relaxed),
            current_used: alloc_cnt.saturating_sub(free_cnt),
        }
    }
}

/// A snapshot of the allocator's counters, measured in frames.
#[derive(Debug, Clone)]
pub struct Stat {
    capacity: usize,
    alloc_cnt: usize,
    free_cnt: usize,
    steal_cnt: usize,
    current_used: usize,
}

impl Stat {
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn alloc_cnt(&self) -> usize {
        self.alloc_cnt
    }
    pub fn free_cnt(&self) -> usize {
        self.free_cnt
    }
    pub fn steal_cnt(&self) -> usize {
        self.steal_cnt
    }
    pub fn current_used(&self) -> usize {
        self.current_used
    }
}

impl Display for Stat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Statistics of physical memory (measured in frames):")?;
        writeln!(f, "\tCapacity: {}", self.capacity)?;
        writeln!(f, "\tAmount of all allocated: {}", self.alloc_cnt)?;
        writeln!(f, "\tAmount of all freed: {}", self.free_cnt)?;
        writeln!(f, "\tStolen from other CPUs: {}", self.steal_cnt)?;
        writeln!(f, "\tCurrently in use: {}", self.current_used)
    }
}
