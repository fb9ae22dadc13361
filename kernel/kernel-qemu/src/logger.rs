use crate::qemu_trace;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// A [`log::Log`] backend writing to QEMU's debug console.
pub struct QemuLogger {
    max_level: LevelFilter,
}

impl QemuLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Call this once during early init.
    #[allow(
        static_mut_refs,
        clippy::missing_errors_doc,
        clippy::missing_panics_doc
    )]
    pub fn init(self) -> Result<(), SetLoggerError> {
        // log::set_logger needs a &'static Log; without an allocator the
        // instance lives in a static.
        static mut LOGGER: Option<QemuLogger> = None;

        // SAFETY: init runs once, before interrupts are enabled, so the
        // static is written without competition.
        unsafe {
            LOGGER = Some(self);
            log::set_logger(LOGGER.as_ref().unwrap() as &'static dyn Log)?;
        }
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format: "[LEVEL] target: message\n"
        qemu_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        // no-op for qemu debug port
    }
}
