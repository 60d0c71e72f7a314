//! Host threads as schedulable tasks.
//!
//! Blocking parks the thread; unblocking unparks it. A per-thread flag makes
//! the wakeup sticky, so an unblock that races ahead of the park is not lost
//! and spurious unparks are absorbed.

use core::sync::atomic::{
    AtomicBool, AtomicUsize,
    Ordering::{AcqRel, Release, SeqCst},
};
use std::{
    sync::Arc,
    thread::{self, Thread},
};

pub use archop::hosted::Hosted;

use crate::Sched;

#[derive(Debug)]
pub struct Parker {
    notified: AtomicBool,
    thread: Thread,
}

static NEXT_TID: AtomicUsize = AtomicUsize::new(1);

std::thread_local! {
    static PARKER: Arc<Parker> = Arc::new(Parker {
        notified: AtomicBool::new(false),
        thread: thread::current(),
    });
    static TID: usize = NEXT_TID.fetch_add(1, SeqCst);
}

impl Sched for Hosted {
    type Task = Arc<Parker>;

    fn current() -> Self::Task {
        PARKER.with(Arc::clone)
    }

    fn current_id() -> usize {
        TID.with(|tid| *tid)
    }

    fn block<G>(guard: G) {
        let me = Self::current();
        drop(guard);
        assert!(
            archop::hosted::intr_enabled(),
            "task {} sleeps with interrupts paused",
            Self::current_id()
        );
        while !me.notified.swap(false, AcqRel) {
            thread::park();
        }
    }

    fn unblock(task: Self::Task) {
        task.notified.store(true, Release);
        task.thread.unpark();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn unblock_before_block_is_kept() {
        Hosted::unblock(Hosted::current());
        Hosted::block(());
    }

    #[test]
    fn task_ids_are_unique() {
        let here = Hosted::current_id();
        let there = thread::spawn(Hosted::current_id).join().unwrap();
        assert_ne!(here, 0);
        assert_ne!(here, there);
        assert_eq!(here, Hosted::current_id());
    }

    #[test]
    #[should_panic(expected = "interrupts paused")]
    fn sleeping_under_a_spin_lock_is_fatal() {
        let _intr = archop::IntrState::<Hosted>::lock();
        Hosted::block(());
    }
}
