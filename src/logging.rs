//! Logger setup.
//!
//! Records are redacted with the console's [`Masks`] before `env_logger`
//! writes them, so file names and error texts carrying a secret stay hidden
//! at any verbosity.

use crate::console::Masks;
use log::LevelFilter;
use std::io::Write;

/// Logger builder at `level`, without timestamps, redacting through `masks`.
pub fn builder(level: LevelFilter, masks: Masks) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format(move |buf, record| {
        let message = masks.redact(&record.args().to_string());
        writeln!(buf, "[{} {}] {}", record.level(), record.target(), message)
    });
    builder
}
