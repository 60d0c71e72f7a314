use core::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use spin::{Mutex, MutexGuard};

use crate::Arch;

/// Interrupts stay paused on the current CPU while this value lives.
///
/// Every `IntrState` saves the state it found and restores exactly that on
/// drop, so nested states compose: only the outermost one turns interrupts
/// back on.
pub struct IntrState<A: Arch> {
    saved: u64,
    // Must be dropped on the CPU it was created on.
    _marker: PhantomData<*const A>,
}

impl<A: Arch> IntrState<A> {
    pub fn lock() -> Self {
        IntrState {
            saved: unsafe { A::pause_intr() },
            _marker: PhantomData,
        }
    }

    /// The CPU this state pins the caller to.
    #[inline]
    pub fn cpu_id(&self) -> usize {
        A::cpu_id()
    }
}

impl<A: Arch> Drop for IntrState<A> {
    fn drop(&mut self) {
        unsafe { A::resume_intr(Some(self.saved)) };
    }
}

pub struct IntrMutexGuard<'a, T, A: Arch>(MutexGuard<'a, T>, IntrState<A>);

impl<'a, T, A: Arch> Deref for IntrMutexGuard<'a, T, A> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a, T, A: Arch> DerefMut for IntrMutexGuard<'a, T, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// The non-blocking lock: a spin lock held with interrupts paused.
///
/// Guards short structural updates only. Never hold one across I/O or while
/// waiting on anything that may sleep.
#[derive(Debug)]
pub struct IntrMutex<T, A: Arch>(Mutex<T>, PhantomData<fn() -> A>);

impl<T, A: Arch> IntrMutex<T, A> {
    pub const fn new(data: T) -> Self {
        IntrMutex(Mutex::new(data), PhantomData)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }

    pub fn lock(&self) -> IntrMutexGuard<T, A> {
        let state = IntrState::lock();
        let guard = self.0.lock();
        IntrMutexGuard(guard, state)
    }

    pub fn is_locked(&self) -> bool {
        self.0.is_locked()
    }
}
