// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! `log` crate facade over a configured serial port.

use crate::regs::{UsartBus, UsartMmio};
use crate::usart::Usart;

// The logger utilizes core::fmt to format the log messages because ufmt
// formatting is not compatible with (dependencies of) the log crate.
use core::cell::RefCell;
use core::fmt::Write;
use log::LevelFilter;

/// A global logger instance over the hardware port, to be used with the
/// `log` crate.
///
/// Hand it a configured port with `set_port`, then install it with
/// `log::set_logger`.
pub static LOGGER: SerialLogger<UsartMmio> =
    SerialLogger::new(LevelFilter::Trace, LevelFilter::Trace);

/// Adapter exposing a [`Usart`] as a `log` crate sink.
///
/// Generic over the register bus, so a simulated bank can stand in for
/// hardware the same way it does for the driver itself.
///
/// # Safety
/// `SerialLogger` claims `Send` and `Sync` but the underlying port is
/// neither; using it is only safe with a single thread of execution and
/// no interrupts touching the port.
pub struct SerialLogger<B> {
    port: RefCell<Option<Usart<B>>>,
    display_level: LevelFilter,
    display_source: LevelFilter,
}

impl<B: UsartBus> SerialLogger<B> {
    /// Create a logger with no port bound yet.
    ///
    /// Records at or below `display_level` are prefixed with their level;
    /// records at or below `display_source` carry the source location.
    pub const fn new(display_level: LevelFilter, display_source: LevelFilter) -> SerialLogger<B> {
        SerialLogger {
            port: RefCell::new(None),
            display_level,
            display_source,
        }
    }

    /// Bind the port all subsequent records are written to.
    pub fn set_port(&self, port: Usart<B>) {
        *self.port.borrow_mut() = Some(port);
    }

    /// Release the bound port, if any.
    pub fn into_port(self) -> Option<Usart<B>> {
        self.port.into_inner()
    }
}

impl<B: UsartBus> log::Log for SerialLogger<B> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        log::Level::Info <= metadata.level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            match &mut *self.port.borrow_mut() {
                Some(port) => {
                    if record.level() <= self.display_level {
                        write!(port, "{} | ", record.level()).unwrap()
                    }
                    if record.level() <= self.display_source {
                        write!(
                            port,
                            "{}:{} - ",
                            record.file().unwrap_or("?"),
                            record.line().unwrap_or(0)
                        )
                        .unwrap();
                    }
                    writeln!(port, "{}", record.args()).unwrap();
                }
                None => panic!("Logger not set"),
            }
        }
    }

    fn flush(&self) {}
}

unsafe impl<B> core::marker::Send for SerialLogger<B> {}
unsafe impl<B> core::marker::Sync for SerialLogger<B> {}
