//! # Blocking locks
//!
//! A [`SleepLock`] may be held across slow operations such as disk I/O. A
//! context that finds it taken is parked on the lock's [`WaitObject`] and
//! handed back to the scheduler instead of spinning.
//!
//! The scheduler itself is consumed through [`Sched`].

#![no_std]

#[cfg(any(test, feature = "hosted"))]
extern crate std;

mod lock;
mod wait;

use archop::Arch;

pub use self::{
    lock::{SleepLock, SleepLockGuard},
    wait::WaitObject,
};

/// The operations consumed from the scheduler.
pub trait Sched: Arch {
    /// A handle to a blocked task, good for exactly one wakeup.
    type Task: Send;

    /// The handle of the calling task.
    fn current() -> Self::Task;

    /// A unique, non-zero identifier of the calling task.
    fn current_id() -> usize;

    /// Block the calling task until [`Sched::unblock`] is called on its
    /// handle.
    ///
    /// `guard` is released only after the task is committed to sleeping, so a
    /// wakeup issued by whoever takes the guard next cannot be lost.
    fn block<G>(guard: G);

    /// Make a blocked task runnable again.
    fn unblock(task: Self::Task);
}

#[cfg(any(test, feature = "hosted"))]
pub mod hosted;
