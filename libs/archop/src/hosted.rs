//! A simulated machine on top of host threads.
//!
//! Each host thread plays one execution context. It runs on the CPU it was
//! bound to with [`bind_cpu`] (CPU 0 by default) and carries its own
//! interrupt-enable flag, so nesting behaves as it would on one core.

use core::{
    cell::Cell,
    fmt::{Display, Formatter, Result},
};
use std::eprintln;

use crate::Arch;

std::thread_local! {
    static CPU_ID: Cell<usize> = const { Cell::new(0) };
    static INTR_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// The simulated architecture.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hosted;

unsafe impl Arch for Hosted {
    #[inline]
    fn cpu_id() -> usize {
        CPU_ID.with(Cell::get)
    }

    #[inline]
    unsafe fn pause_intr() -> u64 {
        INTR_ENABLED.with(|intr| intr.replace(false)) as u64
    }

    #[inline]
    unsafe fn resume_intr(state: Option<u64>) {
        if state.map_or(true, |state| state != 0) {
            INTR_ENABLED.with(|intr| intr.set(true));
        }
    }
}

/// Run the calling thread on `cpu` from now on.
///
/// # Panics
///
/// If `cpu` is not below [`minfo::NCPU`], or interrupts are paused.
pub fn bind_cpu(cpu: usize) {
    assert!(cpu < minfo::NCPU, "CPU #{} does not exist", cpu);
    assert!(intr_enabled(), "migrating with interrupts paused");
    CPU_ID.with(|id| id.set(cpu));
}

/// Whether interrupts are enabled for the calling context.
pub fn intr_enabled() -> bool {
    INTR_ENABLED.with(Cell::get)
}

struct OptionU32Display(Option<u32>);

impl Display for OptionU32Display {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(val) = self.0 {
            write!(f, "{}", val)
        } else {
            write!(f, "<NULL>")
        }
    }
}

struct Logger;

impl log::Log for Logger {
    #[inline]
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if record.level() < log::Level::Debug {
            eprintln!("{}: {}", record.level(), record.args());
        } else {
            let file = record.file().unwrap_or("<NULL>");
            let line = OptionU32Display(record.line());
            eprintln!(
                "{}: [#{} {}:{}] {}",
                record.level(),
                Hosted::cpu_id(),
                file,
                line,
                record.args()
            );
        }
    }

    #[inline]
    fn flush(&self) {}
}

static LOGGER: Logger = Logger;

/// Route the `log` facade to the host's standard error.
///
/// Calling it again only changes the level.
pub fn init_logger(max_level: log::Level) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(max_level.to_level_filter());
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn threads_carry_their_own_cpu() {
        bind_cpu(3);
        let other = thread::spawn(|| {
            bind_cpu(1);
            Hosted::cpu_id()
        });
        assert_eq!(other.join().unwrap(), 1);
        assert_eq!(Hosted::cpu_id(), 3);
    }

    #[test]
    fn resume_without_state_enables() {
        unsafe {
            let saved = Hosted::pause_intr();
            assert_eq!(saved, 1);
            assert_eq!(Hosted::pause_intr(), 0);
            Hosted::resume_intr(None);
        }
        assert!(intr_enabled());
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn bind_out_of_range() {
        bind_cpu(minfo::NCPU);
    }

    #[test]
    fn logger_can_be_installed_twice() {
        init_logger(log::Level::Trace);
        log::trace!("first");
        init_logger(log::Level::Warn);
        assert_eq!(log::max_level(), log::LevelFilter::Warn);
    }
}
