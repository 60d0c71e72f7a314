use core::{
    fmt::Display,
    sync::atomic::{AtomicUsize, Ordering::Relaxed},
};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
    disk_reads: AtomicUsize,
    disk_writes: AtomicUsize,
    evictions: AtomicUsize,
}

impl Counters {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Relaxed);
    }

    pub fn disk_read(&self) {
        self.disk_reads.fetch_add(1, Relaxed);
    }

    pub fn disk_write(&self) {
        self.disk_writes.fetch_add(1, Relaxed);
    }

    pub fn evict(&self) {
        self.evictions.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self, nr_bufs: usize) -> Stat {
        Stat {
            nr_bufs,
            hits: self.hits.load(Relaxed),
            misses: self.misses.load(Relaxed),
            disk_reads: self.disk_reads.load(Relaxed),
            disk_writes: self.disk_writes.load(Relaxed),
            evictions: self.evictions.load(Relaxed),
        }
    }
}

/// A snapshot of the cache's counters.
#[derive(Debug, Clone)]
pub struct Stat {
    nr_bufs: usize,
    hits: usize,
    misses: usize,
    disk_reads: usize,
    disk_writes: usize,
    evictions: usize,
}

impl Stat {
    pub fn nr_bufs(&self) -> usize {
        self.nr_bufs
    }
    pub fn hits(&self) -> usize {
        self.hits
    }
    pub fn misses(&self) -> usize {
        self.misses
    }
    pub fn disk_reads(&self) -> usize {
        self.disk_reads
    }
    pub fn disk_writes(&self) -> usize {
        self.disk_writes
    }
    pub fn evictions(&self) -> usize {
        self.evictions
    }
}

impl Display for Stat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Statistics of the block cache:")?;
        writeln!(f, "\tBuffers: {}", self.nr_bufs)?;
        writeln!(f, "\tLookup hits: {}", self.hits)?;
        writeln!(f, "\tLookup misses: {}", self.misses)?;
        writeln!(f, "\tBlocks read from disk: {}", self.disk_reads)?;
        writeln!(f, "\tBlocks written to disk: {}", self.disk_writes)?;
        writeln!(f, "\tEvictions: {}", self.evictions)
    }
}
