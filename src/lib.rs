#![doc = include_str!("../README.md")]

pub mod config;
pub mod control;
pub mod error;
pub mod fm;
pub mod resources;
pub mod synth;
pub mod visualization;
pub mod voice_pool;

pub use config::Config;
pub use control::{Command, Controller, MidiMessage, Rejected};
pub use error::{ConfigError, Error, Result};
pub use fm::patch::VoiceParams;
pub use resources::Tables;
pub use synth::{RenderStatus, Synth};

/// Converts an engine output sample to a float in the range -1.0..1.0.
#[inline]
pub fn sample_to_f32(sample: i32) -> f32 {
    sample as f32 / 2_147_483_648.0
}
