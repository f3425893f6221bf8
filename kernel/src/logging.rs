//! `log` crate front end backed by the COM1 serial port.
//!
//! Installed once during bringup (`boot::init`); every subsystem's init
//! routine logs a one-line `info!` on success, mirroring the panic path's
//! existing serial mirror instead of inventing a second wire format.

use log::{LevelFilter, Log, Metadata, Record};

use crate::drivers::serial;

struct SerialLogger;

static LOGGER: SerialLogger = SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        serial::print_fmt(format_args!(
            "[{:<5} {}] {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

fn max_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

/// Installs the serial-backed logger. Must run after `serial::init` and
/// before any other subsystem's bringup, since their init routines log.
pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(max_level()))
        .expect("logger installed twice");
}
