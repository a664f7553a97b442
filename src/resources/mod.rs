//! Fixed lookup tables.
//!
//! Every table is generated from a documented formula so that two independent
//! builds produce bit-identical audio. Tables can also be persisted to and
//! restored from the hex resource format in [`hex`].
//!
//! Number formats:
//! - log-frequency: log2(Hz) with [`LOG_FREQUENCY_BITS`] fraction bits.
//! - phase: one cycle spans `1 << LOG_FREQUENCY_BITS`; accumulators are `u32`
//!   and the bits above one cycle are ignored.
//! - log-amplitude: 1/256 octave steps, [`SIGN_FLAG`] tags negative half-waves.

pub mod hex;

use std::f64::consts::FRAC_PI_2;
use std::path::Path;
use std::sync::Arc;

use spin::Once;

use crate::config::SAMPLE_RATE;
use crate::error::ConfigError;
use crate::fm::algorithms::{Algorithm, ROUTING};
use crate::fm::dx_units::operator_level;
use crate::fm::{NUM_ALGORITHMS, NUM_OPERATORS};

/// Fraction bits of a log-frequency value; one octave is `1 << 24`.
pub const LOG_FREQUENCY_BITS: u32 = 24;

/// Address bits of the log-frequency to phase table.
pub const PHASE_TABLE_BITS: u32 = 10;

/// Entries in the log-frequency to phase table, not counting the guard entry.
pub const PHASE_TABLE_SIZE: usize = 1 << PHASE_TABLE_BITS;

/// Bits below the phase table address. One detune step is `1 << 14`.
pub const PHASE_TABLE_SHIFT: u32 = LOG_FREQUENCY_BITS - PHASE_TABLE_BITS;

/// Guard bits of the phase table. Octaves above this saturate to 0.
pub const PHASE_GUARD_BITS: u32 = 16;

/// Number of MIDI notes.
pub const NOTE_TABLE_SIZE: usize = 128;

/// Address bits (and scale) of the quarter-wave log-sine table.
pub const LOG_SINE_BITS: u32 = 8;

/// Entries in the quarter-wave log-sine table.
pub const LOG_SINE_TABLE_SIZE: usize = 1 << LOG_SINE_BITS;

/// Address bits of the exponential table (one octave of log-amplitude).
pub const EXP_TABLE_BITS: u32 = 8;

/// Entries in the exponential table.
pub const EXP_TABLE_SIZE: usize = 1 << EXP_TABLE_BITS;

/// Scale of the exponential table values.
pub const EXP_SCALE_BITS: u32 = 10;

/// Tag OR-ed into log-sine values of the negative half-wave.
pub const SIGN_FLAG: u16 = 0x8000;

/// Entries in the coarse ratio table.
pub const COARSE_TABLE_SIZE: usize = 32;

/// Entries in the fine ratio table.
pub const FINE_TABLE_SIZE: usize = 100;

/// Entries in the level scale table (parameter values 0..=99).
pub const LEVEL_SCALE_TABLE_SIZE: usize = 100;

/// Bit width of the level scale values.
pub const LEVEL_SCALE_BITS: u32 = 7;

/// Concert pitch anchoring the note table.
pub const BASE_PITCH_HZ: f64 = 440.0;

/// MIDI note of [`BASE_PITCH_HZ`].
pub const BASE_PITCH_NOTE: u32 = 69;

const HALF_TONES_PER_OCTAVE: u32 = 12;

/// Resource file names, shared by [`Tables::load`] and [`Tables::save`].
pub mod files {
    pub const NOTE_TO_LOG_FREQUENCY: &str = "hex_u32_note_to_log_freq.mem";
    pub const LOG_FREQUENCY_TO_PHASE: &str = "hex_u32_log_freq_to_phase.mem";
    pub const LOG_SINE: &str = "hex_u16_log_sin.mem";
    pub const EXP: &str = "hex_u16_exp.mem";
    pub const COARSE: &str = "hex_i32_coarse_log_mult.mem";
    pub const FINE: &str = "hex_u32_fine_log_mult.mem";
    pub const LEVEL_SCALE: &str = "hex_u8_level_scale.mem";
    pub const ALGORITHM_ROUTING: &str = "hex_u8_algorithm_routing.mem";
}

static BUILTIN: Once<Arc<Tables>> = Once::new();

/// The complete set of read-only tables used by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub(crate) note_to_log_frequency: [u32; NOTE_TABLE_SIZE],
    pub(crate) log_frequency_to_phase: [u32; PHASE_TABLE_SIZE + 1],
    pub(crate) log_sine: [u16; LOG_SINE_TABLE_SIZE],
    pub(crate) exp: [u16; EXP_TABLE_SIZE],
    pub(crate) coarse: [i32; COARSE_TABLE_SIZE],
    pub(crate) fine: [u32; FINE_TABLE_SIZE],
    pub(crate) level_scale: [u8; LEVEL_SCALE_TABLE_SIZE],
    pub(crate) routing: [[u8; NUM_OPERATORS]; NUM_ALGORITHMS],
    pub(crate) algorithms: [Algorithm; NUM_ALGORITHMS],
}

impl Tables {
    /// Returns the tables for [`SAMPLE_RATE`], generated on first use and
    /// shared by every engine running at that rate.
    pub fn builtin() -> Result<Arc<Tables>, ConfigError> {
        BUILTIN
            .try_call_once(|| Self::generate(SAMPLE_RATE).map(Arc::new))
            .cloned()
    }

    /// Computes every table for the given sample rate.
    pub fn generate(sample_rate: u32) -> Result<Self, ConfigError> {
        if sample_rate < 1024 {
            return Err(ConfigError::InvalidSetting {
                name: "sample_rate",
                reason: "must be at least 1024 Hz",
            });
        }

        let octave = f64::from(1u32 << LOG_FREQUENCY_BITS);

        let note_base = (octave
            * (BASE_PITCH_HZ.log2()
                - f64::from(BASE_PITCH_NOTE) / f64::from(HALF_TONES_PER_OCTAVE)))
            as u32;
        let note_step = (1 << LOG_FREQUENCY_BITS) / HALF_TONES_PER_OCTAVE;
        let note_to_log_frequency =
            core::array::from_fn(|i| note_base + note_step * i as u32);

        let phase_base =
            (1u64 << (LOG_FREQUENCY_BITS + PHASE_GUARD_BITS)) as f64 / f64::from(sample_rate);
        let log_frequency_to_phase = core::array::from_fn(|i| {
            (phase_base * (i as f64 / PHASE_TABLE_SIZE as f64).exp2()).round() as u32
        });

        let log_sine = core::array::from_fn(|i| {
            let angle = (i as f64 + 0.5) / LOG_SINE_TABLE_SIZE as f64 * FRAC_PI_2;
            (-f64::from(1u32 << LOG_SINE_BITS) * angle.sin().log2()).round() as u16
        });

        let exp = core::array::from_fn(|i| {
            (f64::from(1u32 << EXP_SCALE_BITS) * ((i as f64 / EXP_TABLE_SIZE as f64).exp2() - 1.0))
                .round() as u16
        });

        let coarse = core::array::from_fn(|i| {
            let ratio = if i == 0 { 0.5 } else { i as f64 };
            // Truncated, unlike the other tables.
            (octave * ratio.log2()) as i32
        });

        let fine = core::array::from_fn(|i| (octave * (1.0 + i as f64 / 100.0).log2()).round() as u32);

        let level_scale = core::array::from_fn(|i| operator_level(i as u8));

        let tables = Self::from_parts(
            note_to_log_frequency,
            log_frequency_to_phase,
            log_sine,
            exp,
            coarse,
            fine,
            level_scale,
            ROUTING,
        )?;

        log::info!("Generated lookup tables for {sample_rate} Hz");

        Ok(tables)
    }

    /// Loads every table from the hex resources in `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();

        let mut note_to_log_frequency = [0; NOTE_TABLE_SIZE];
        let mut log_frequency_to_phase = [0; PHASE_TABLE_SIZE + 1];
        let mut log_sine = [0; LOG_SINE_TABLE_SIZE];
        let mut exp = [0; EXP_TABLE_SIZE];
        let mut coarse = [0; COARSE_TABLE_SIZE];
        let mut fine = [0; FINE_TABLE_SIZE];
        let mut level_scale = [0; LEVEL_SCALE_TABLE_SIZE];
        let mut routing = [[0; NUM_OPERATORS]; NUM_ALGORITHMS];

        hex::read_file(
            dir.join(files::NOTE_TO_LOG_FREQUENCY),
            &mut note_to_log_frequency,
        )?;
        hex::read_file(
            dir.join(files::LOG_FREQUENCY_TO_PHASE),
            &mut log_frequency_to_phase,
        )?;
        hex::read_file(dir.join(files::LOG_SINE), &mut log_sine)?;
        hex::read_file(dir.join(files::EXP), &mut exp)?;
        hex::read_file(dir.join(files::COARSE), &mut coarse)?;
        hex::read_file(dir.join(files::FINE), &mut fine)?;
        hex::read_file(dir.join(files::LEVEL_SCALE), &mut level_scale)?;
        hex::read_file(
            dir.join(files::ALGORITHM_ROUTING),
            routing.as_flattened_mut(),
        )?;

        let tables = Self::from_parts(
            note_to_log_frequency,
            log_frequency_to_phase,
            log_sine,
            exp,
            coarse,
            fine,
            level_scale,
            routing,
        )?;

        log::info!("Loaded lookup tables from {}", dir.display());

        Ok(tables)
    }

    /// Writes every table as a hex resource into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), ConfigError> {
        let dir = dir.as_ref();

        hex::write_file(
            dir.join(files::NOTE_TO_LOG_FREQUENCY),
            &self.note_to_log_frequency,
        )?;
        hex::write_file(
            dir.join(files::LOG_FREQUENCY_TO_PHASE),
            &self.log_frequency_to_phase,
        )?;
        hex::write_file(dir.join(files::LOG_SINE), &self.log_sine)?;
        hex::write_file(dir.join(files::EXP), &self.exp)?;
        hex::write_file(dir.join(files::COARSE), &self.coarse)?;
        hex::write_file(dir.join(files::FINE), &self.fine)?;
        hex::write_file(dir.join(files::LEVEL_SCALE), &self.level_scale)?;
        hex::write_file(
            dir.join(files::ALGORITHM_ROUTING),
            self.routing.as_flattened(),
        )?;

        log::info!("Saved lookup tables to {}", dir.display());

        Ok(())
    }

    /// Assembles tables from raw data, validating what the engine relies on.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        note_to_log_frequency: [u32; NOTE_TABLE_SIZE],
        log_frequency_to_phase: [u32; PHASE_TABLE_SIZE + 1],
        log_sine: [u16; LOG_SINE_TABLE_SIZE],
        exp: [u16; EXP_TABLE_SIZE],
        coarse: [i32; COARSE_TABLE_SIZE],
        fine: [u32; FINE_TABLE_SIZE],
        level_scale: [u8; LEVEL_SCALE_TABLE_SIZE],
        routing: [[u8; NUM_OPERATORS]; NUM_ALGORITHMS],
    ) -> Result<Self, ConfigError> {
        // Interpolation assumes a rising table.
        if log_frequency_to_phase.windows(2).any(|w| w[1] < w[0]) {
            return Err(malformed(
                files::LOG_FREQUENCY_TO_PHASE,
                "values must not decrease",
            ));
        }
        if log_sine.iter().any(|&v| v & SIGN_FLAG != 0) {
            return Err(malformed(files::LOG_SINE, "values must stay below the sign flag"));
        }
        if exp.iter().any(|&v| u32::from(v) >= 1 << EXP_SCALE_BITS) {
            return Err(malformed(files::EXP, "values must stay below 1 << 10"));
        }
        if level_scale.iter().any(|&v| u32::from(v) >= 1 << LEVEL_SCALE_BITS) {
            return Err(malformed(files::LEVEL_SCALE, "values must stay below 128"));
        }

        let mut algorithms = [Algorithm::default(); NUM_ALGORITHMS];
        for (index, (algorithm, row)) in algorithms.iter_mut().zip(routing.iter()).enumerate() {
            *algorithm = Algorithm::compile(index, row)?;
        }

        Ok(Self {
            note_to_log_frequency,
            log_frequency_to_phase,
            log_sine,
            exp,
            coarse,
            fine,
            level_scale,
            routing,
            algorithms,
        })
    }

    /// Sample rate the phase table was built for, recovered from its first
    /// entry. Zero if that entry is zero.
    pub fn sample_rate(&self) -> u32 {
        let base = u64::from(self.log_frequency_to_phase[0]);
        let scale = 1u64 << (LOG_FREQUENCY_BITS + PHASE_GUARD_BITS);

        (scale + base / 2)
            .checked_div(base)
            .map_or(0, |rate| rate.min(u64::from(u32::MAX)) as u32)
    }

    pub fn note_to_log_frequency(&self) -> &[u32; NOTE_TABLE_SIZE] {
        &self.note_to_log_frequency
    }

    pub fn log_frequency_to_phase(&self) -> &[u32; PHASE_TABLE_SIZE + 1] {
        &self.log_frequency_to_phase
    }

    pub fn log_sine(&self) -> &[u16; LOG_SINE_TABLE_SIZE] {
        &self.log_sine
    }

    pub fn exp(&self) -> &[u16; EXP_TABLE_SIZE] {
        &self.exp
    }

    pub fn coarse(&self) -> &[i32; COARSE_TABLE_SIZE] {
        &self.coarse
    }

    pub fn fine(&self) -> &[u32; FINE_TABLE_SIZE] {
        &self.fine
    }

    pub fn level_scale(&self) -> &[u8; LEVEL_SCALE_TABLE_SIZE] {
        &self.level_scale
    }

    pub fn routing(&self) -> &[[u8; NUM_OPERATORS]; NUM_ALGORITHMS] {
        &self.routing
    }

    /// Compiled operator graph of an algorithm.
    ///
    /// Panics if `index` is not below [`NUM_ALGORITHMS`]; patches are checked
    /// for this before they reach the engine.
    #[inline]
    pub fn algorithm(&self, index: u8) -> &Algorithm {
        &self.algorithms[index as usize]
    }
}

fn malformed(name: &str, reason: &str) -> ConfigError {
    ConfigError::MalformedTable {
        name: name.into(),
        reason: reason.into(),
    }
}
