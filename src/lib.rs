//! Parse USB Audio Class configuration descriptors into a queryable topology.
//!
//! A raw configuration descriptor (as read from a device) is walked once by [`topology::ConfigurationModel::parse`],
//! which decodes the requested AudioControl interface (UAC 1.0 or 2.0) into a [`topology::ControlTopology`] unit graph
//! and every alternate setting of the AudioStreaming interfaces it controls into a [`topology::StreamTopology`].
//! The resulting model is read-only and answers structural questions about the audio function: which clock feeds a
//! terminal, does a feature unit channel have mute, which alternate setting carries a given format.
#![allow(dead_code)]
#![warn(missing_docs)]
use simple_logger::SimpleLogger;

pub mod config;
pub mod display;
pub mod error;
pub mod topology;
pub mod usb;

pub use topology::ConfigurationModel;

/// Set module and binary log level
pub fn set_log_level(debug: u8) -> crate::error::Result<()> {
    match debug {
        // just use env if not passed
        0 => SimpleLogger::new()
            .with_utc_timestamps()
            .with_level(log::Level::Error.to_level_filter())
            .env(),
        1 => SimpleLogger::new()
            .with_utc_timestamps()
            .with_level(log::Level::Info.to_level_filter()),
        2 => SimpleLogger::new()
            .with_utc_timestamps()
            .with_level(log::Level::Debug.to_level_filter()),
        _ => SimpleLogger::new()
            .with_utc_timestamps()
            .with_level(log::Level::Trace.to_level_filter()),
    }
    .init()
    .map_err(|e| {
        crate::error::Error::new(
            crate::error::ErrorKind::Other("simple_logger"),
            &format!("Failed to set log level: {}", e),
        )
    })?;

    Ok(())
}
