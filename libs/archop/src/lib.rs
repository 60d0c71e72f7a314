//! # Architecture operations
//!
//! The lowest layer the memory managers stand on: who the current CPU is, and
//! how to keep external interrupts away from a short critical section.
//!
//! The kernel supplies these through [`Arch`]. Everything above is generic
//! over it, so the same allocator code runs on real hardware and on the
//! [`hosted`] simulation where host threads stand in for cores.

#![no_std]

#[cfg(any(test, feature = "hosted"))]
extern crate std;

mod lock;

pub use self::lock::{IntrMutex, IntrMutexGuard, IntrState};

/// The per-CPU primitives consumed from the interrupt subsystem.
///
/// # Safety
///
/// `cpu_id` must return a stable value while interrupts are paused on the
/// calling context, and `pause_intr`/`resume_intr` must behave like the
/// `cli`/`popf` pair: the value returned by `pause_intr` restores exactly the
/// state before that call.
pub unsafe trait Arch: 'static {
    /// The index of the calling CPU, in `0..minfo::NCPU`.
    fn cpu_id() -> usize;

    /// Disable external interrupts, returning the previous interrupt state.
    ///
    /// # Safety
    ///
    /// The returned state must be handed back to [`Arch::resume_intr`] on the
    /// same CPU.
    unsafe fn pause_intr() -> u64;

    /// Restore the interrupt state saved by [`Arch::pause_intr`], or enable
    /// interrupts unconditionally if `state` is `None`.
    ///
    /// # Safety
    ///
    /// See [`Arch::pause_intr`].
    unsafe fn resume_intr(state: Option<u64>);
}

cfg_if::cfg_if! {
    if #[cfg(any(test, feature = "hosted"))] {
        pub mod hosted;
    }
}
