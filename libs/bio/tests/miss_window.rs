//! A task that binds a buffer on a miss drops the bucket lock before it takes
//! the buffer's sleep lock. This test parks the binding task right in that
//! window, through the trace record it emits there, and lets another reader
//! of the same block go first.

use std::{
    sync::atomic::{AtomicBool, Ordering::SeqCst},
    thread,
    time::Duration,
};

use bio::{Bcache, BlockId, RamDisk, BSIZE};
use sleeplock::hosted::Hosted;

type Cache = Bcache<Hosted, RamDisk>;

const BINDER: &str = "binder";

static IN_WINDOW: AtomicBool = AtomicBool::new(false);
static RESUME: AtomicBool = AtomicBool::new(false);

/// Holds the binder thread on its `bound` record until `RESUME` is set.
struct Stall;

impl log::Log for Stall {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let binder = thread::current().name() == Some(BINDER);
        if binder && record.args().to_string().contains("bound") {
            IN_WINDOW.store(true, SeqCst);
            while !RESUME.load(SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    fn flush(&self) {}
}

static STALL: Stall = Stall;

fn wait_for(cond: impl Fn() -> bool) {
    while !cond() {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn hit_inside_the_miss_window_fills_once() {
    log::set_logger(&STALL).unwrap();
    log::set_max_level(log::LevelFilter::Trace);

    let c = Cache::new(RamDisk::new());
    c.disk().store(BlockId::new(1, 5), &[0x5a; BSIZE]);

    thread::scope(|s| {
        let binder = thread::Builder::new()
            .name(BINDER.into())
            .spawn_scoped(s, || {
                let buf = c.read(1, 5);
                (buf.is_valid(), buf[0], buf[1..].iter().all(|&b| b == 0x5a))
            })
            .unwrap();

        // The binder owns the slot but not yet its sleep lock.
        wait_for(|| IN_WINDOW.load(SeqCst));
        assert_eq!(c.refcnt(1, 5), 1);

        let mut buf = c.read(1, 5);
        assert_eq!(c.refcnt(1, 5), 2);
        assert!(buf.is_valid());
        assert!(buf.iter().all(|&b| b == 0x5a));
        // Changes made here must survive the binder getting the lock.
        buf[0] = 0x77;
        c.release(buf);

        RESUME.store(true, SeqCst);
        assert_eq!(binder.join().unwrap(), (true, 0x77, true));
    });

    assert_eq!(c.disk().reads(), 1);
    assert!(!c.is_cached(1, 5));
    let stat = c.stat();
    assert_eq!((stat.hits(), stat.misses()), (1, 1));
}
