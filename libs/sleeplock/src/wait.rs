use crossbeam_queue::SegQueue;

use crate::Sched;

/// A queue of tasks waiting for the same event.
pub struct WaitObject<S: Sched> {
    wait_queue: SegQueue<S::Task>,
}

impl<S: Sched> WaitObject<S> {
    #[inline]
    pub fn new() -> Self {
        WaitObject {
            wait_queue: SegQueue::new(),
        }
    }

    /// Enqueue the calling task and block it, releasing `guard` once it is
    /// queued.
    ///
    /// The caller should hold, in `guard`, the lock that any notifier must
    /// take before calling [`WaitObject::notify`].
    pub fn wait<G>(&self, guard: G, block_desc: &'static str) {
        log::trace!("wait: {} blocks task {}", block_desc, S::current_id());
        self.wait_queue.push(S::current());
        S::block(guard);
    }

    /// Wake up to `num` waiters, or all of them if `num` is 0. Returns the
    /// number of tasks woken.
    pub fn notify(&self, num: usize) -> usize {
        let num = if num == 0 { usize::MAX } else { num };

        let mut cnt = 0;
        while cnt < num {
            match self.wait_queue.pop() {
                Some(task) => {
                    S::unblock(task);
                    cnt += 1;
                }
                None => break,
            }
        }
        cnt
    }

    #[inline]
    pub fn waiters(&self) -> usize {
        self.wait_queue.len()
    }
}

impl<S: Sched> Default for WaitObject<S> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
