//! Error types.
//!
//! Failures are concentrated at initialization (tables, configuration, patch
//! decoding) and at the voice-manager boundary. The render path itself has no
//! failure modes once the engine is constructed.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors detected while setting up the engine. Synthesis must not start
/// when one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A patch selected an algorithm outside the routing table.
    #[error("algorithm {0} is out of range (0..{max})", max = crate::fm::NUM_ALGORITHMS)]
    InvalidAlgorithm(u8),

    /// A routing table row cannot be turned into an operator graph.
    #[error("routing for algorithm {algorithm} is malformed: {reason}")]
    MalformedRouting {
        /// Zero-based algorithm index.
        algorithm: usize,
        /// Description of the defect.
        reason: &'static str,
    },

    /// Failed to read a table resource.
    #[error("failed to read table resource '{path}': {source}")]
    ReadTable {
        /// Path of the resource.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a table resource.
    #[error("failed to write table resource '{path}': {source}")]
    WriteTable {
        /// Path of the resource.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A table resource was readable but its content is unusable.
    #[error("malformed table resource '{name}': {reason}")]
    MalformedTable {
        /// Table name.
        name: String,
        /// Description of the defect.
        reason: String,
    },

    /// A configuration value is unusable.
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// Description of the defect.
        reason: &'static str,
    },

    /// A patch bank does not follow the DX7 bulk dump layout.
    #[error("malformed patch bank: {0}")]
    MalformedBank(&'static str),
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal setup error.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// No free or stealable voice was available; the note was dropped.
    #[error("no free or releasing voice available for note {note}")]
    Capacity {
        /// The note that could not be assigned.
        note: u8,
    },

    /// The command queue between control and render context is full.
    #[error("command queue is full")]
    QueueFull,

    /// A note, velocity or patch parameter is outside its documented domain.
    #[error("{parameter} = {value} is out of range (max {max})")]
    Range {
        /// Parameter name.
        parameter: &'static str,
        /// Offending value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// A MIDI message that is neither note-on nor note-off.
    #[error("unsupported MIDI message (status {status:#04x}, {len} bytes)")]
    UnsupportedMidi {
        /// Status byte, or 0 for an empty message.
        status: u8,
        /// Message length.
        len: usize,
    },
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Returns a [`Error::Range`] unless `value <= max`.
#[inline]
pub(crate) fn check_range(parameter: &'static str, value: u8, max: u8) -> Result<()> {
    if value > max {
        return Err(Error::Range {
            parameter,
            value: value.into(),
            max: max.into(),
        });
    }

    Ok(())
}
