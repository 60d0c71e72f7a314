use core::{
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
};

use archop::IntrMutex;

use crate::{Sched, WaitObject};

struct State {
    locked: bool,
    /// The task holding the lock, 0 if none.
    owner: usize,
}

/// A mutual-exclusion lock whose acquisition may suspend the caller.
///
/// Unlocking wakes exactly one waiter. Waiters are not served in any
/// particular order.
pub struct SleepLock<T, S: Sched> {
    state: IntrMutex<State, S>,
    wo: WaitObject<S>,
    name: &'static str,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send, S: Sched> Send for SleepLock<T, S> {}
unsafe impl<T: Send, S: Sched> Sync for SleepLock<T, S> {}

impl<T, S: Sched> SleepLock<T, S> {
    pub fn new(data: T, name: &'static str) -> Self {
        SleepLock {
            state: IntrMutex::new(State {
                locked: false,
                owner: 0,
            }),
            wo: WaitObject::new(),
            name,
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> SleepLockGuard<'_, T, S> {
        let mut state = self.state.lock();
        while state.locked {
            self.wo.wait(state, self.name);
            state = self.state.lock();
        }
        state.locked = true;
        state.owner = S::current_id();
        SleepLockGuard { lock: self }
    }

    /// Whether the calling task holds the lock.
    pub fn holding(&self) -> bool {
        let state = self.state.lock();
        state.locked && state.owner == S::current_id()
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// The number of tasks blocked on the lock.
    pub fn waiters(&self) -> usize {
        self.wo.waiters()
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    fn unlock(&self) {
        let mut state = self.state.lock();
        state.locked = false;
        state.owner = 0;
        self.wo.notify(1);
    }
}

impl<T, S: Sched> fmt::Debug for SleepLock<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SleepLock")
            .field("name", &self.name)
            .field("locked", &self.is_locked())
            .finish()
    }
}

pub struct SleepLockGuard<'a, T, S: Sched> {
    lock: &'a SleepLock<T, S>,
}

impl<'a, T, S: Sched> SleepLockGuard<'a, T, S> {
    /// Whether the calling task is the one that acquired this guard.
    ///
    /// A guard moved to another task is still locked, but not held by it.
    #[inline]
    pub fn holding(&self) -> bool {
        self.lock.holding()
    }
}

impl<'a, T, S: Sched> Deref for SleepLockGuard<'a, T, S> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T, S: Sched> DerefMut for SleepLockGuard<'a, T, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T, S: Sched> Drop for SleepLockGuard<'a, T, S> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
