//! Various "magic" conversion functions for DX7 patch data.
//!
//! Everything here is integer arithmetic on the fixed tables, so the same
//! inputs give the same bits on every target.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use super::patch::{KeyboardLevelScaling, OperatorParams, OscillatorMode, OscillatorParams};
use crate::resources::{
    Tables, COARSE_TABLE_SIZE, FINE_TABLE_SIZE, LOG_FREQUENCY_BITS, PHASE_GUARD_BITS,
    PHASE_TABLE_SHIFT,
};

/// Width of the envelope attenuation in integer units.
pub const ENVELOPE_BITS: u32 = 9;

/// Silent. 0 is the loudest envelope level.
pub const ENVELOPE_MAX: u32 = 1 << ENVELOPE_BITS;

/// Fraction bits of the envelope level while it moves.
pub const ENVELOPE_FRACTION_BITS: u32 = 16;

/// Largest quantised envelope rate.
pub const MAX_ENVELOPE_RATE: u8 = 63;

/// Feedback amount 7 shifts the register right by `FEEDBACK_BITS - 7`.
pub const FEEDBACK_BITS: u32 = 9;

/// Largest keyboard level scaling offset, in level scale units.
pub const MAX_KEYBOARD_SCALING: i32 = 96;

const DETUNE_CENTER: i32 = 7;
const NO_TRANSPOSE: i32 = 24;

// log2(10) / 100 * 2^24, pre-scaled by 2^3. Fixed frequencies are
// 10^((coarse * 100 + fine) / 100) Hz.
const FIXED_FREQUENCY_SCALE: u32 = 4_458_616;

// MIDI note of the first break point (A-1).
const BREAK_POINT_OFFSET: i32 = 21;

const LOG_FREQUENCY_MASK: u32 = (1 << LOG_FREQUENCY_BITS) - 1;
const PHASE_FRACTION_MASK: u32 = (1 << PHASE_TABLE_SHIFT) - 1;

// Convert an operator (envelope) level from 0-99 to the complement of the
// "TL" value.
//   0 =   0  (TL = 127)
//  20 =  48  (TL =  79)
//  50 =  78  (TL =  49)
//  99 = 127  (TL =   0)
#[inline]
pub fn operator_level(level: u8) -> u8 {
    let mut tlc = level as u32;

    if level < 20 {
        tlc = if tlc < 15 {
            (tlc * (36 - tlc)) >> 3
        } else {
            27 + tlc
        };
    } else {
        tlc += 28;
    }

    tlc as u8
}

/// Applies the patch transposition (24 = none) to a played note.
#[inline]
pub fn transpose(note: u8, transpose: u8) -> u8 {
    (i32::from(note) + i32::from(transpose) - NO_TRANSPOSE).clamp(0, 127) as u8
}

/// Log2 frequency of an oscillator, with [`LOG_FREQUENCY_BITS`] fraction bits.
///
/// Wraps silently, like the phase it drives.
#[inline]
pub fn log_frequency(tables: &Tables, note: u8, oscillator: &OscillatorParams) -> u32 {
    let detune = ((i32::from(oscillator.detune) - DETUNE_CENTER) << PHASE_TABLE_SHIFT) as u32;

    let base = match oscillator.mode {
        OscillatorMode::Ratio => tables.note_to_log_frequency[note as usize & 0x7f]
            .wrapping_add(
                tables.coarse[oscillator.coarse as usize % COARSE_TABLE_SIZE] as u32,
            )
            .wrapping_add(tables.fine[oscillator.fine as usize % FINE_TABLE_SIZE]),
        OscillatorMode::Fixed => {
            let exponent = u32::from(oscillator.coarse & 3) * 100 + u32::from(oscillator.fine);
            FIXED_FREQUENCY_SCALE.wrapping_mul(exponent) >> 3
        }
    };

    base.wrapping_add(detune)
}

/// Phase increment per sample for a log frequency. One cycle is
/// `1 << LOG_FREQUENCY_BITS`.
#[inline]
pub fn phase_increment(tables: &Tables, log_frequency: u32) -> u32 {
    let octave = log_frequency >> LOG_FREQUENCY_BITS;
    if octave > PHASE_GUARD_BITS {
        return 0;
    }

    let index = ((log_frequency & LOG_FREQUENCY_MASK) >> PHASE_TABLE_SHIFT) as usize;
    let fraction = log_frequency & PHASE_FRACTION_MASK;

    let a = tables.log_frequency_to_phase[index];
    let b = tables.log_frequency_to_phase[index + 1];
    let interpolated = a + (((b - a) as u64 * fraction as u64) >> PHASE_TABLE_SHIFT) as u32;

    interpolated >> (PHASE_GUARD_BITS - octave)
}

/// Envelope target for a level parameter, in fine units.
#[inline]
pub fn envelope_target(tables: &Tables, level: u8) -> u32 {
    let scaled = u32::from(tables.level_scale[level as usize % tables.level_scale.len()]);

    (ENVELOPE_MAX - (scaled << 2)) << ENVELOPE_FRACTION_BITS
}

// MIDI note to quantised rate offset, 0 to 27.
#[inline]
pub fn rate_scaling(note: u8, rate_scaling: u8) -> u8 {
    let keys = (i32::from(note) / 3 - 7).clamp(0, 31);

    ((i32::from(rate_scaling) * keys) >> 3) as u8
}

/// Quantised envelope rate, 0 to [`MAX_ENVELOPE_RATE`].
#[inline]
pub fn envelope_rate(rate: u8, scaling: u8) -> u8 {
    let rate_scaled = (u32::from(rate) * 41) >> 6;

    (rate_scaled + u32::from(scaling)).min(MAX_ENVELOPE_RATE.into()) as u8
}

// Convert a quantised rate to a level step in fine units per sample.
#[inline]
pub fn envelope_increment(rate: u8) -> u32 {
    let mantissa = 4 + u32::from(rate & 3);
    let exponent = u32::from(rate >> 2);

    mantissa << exponent
}

// Attenuation removed by playing softer, in level scale units.
#[inline]
pub fn velocity_reduction(velocity: u8, sensitivity: u8) -> i32 {
    (i32::from(sensitivity) * (127 - i32::from(velocity.min(127)))) >> 4
}

// Keyboard tracking to TL adjustment. Negative values attenuate.
#[inline]
pub fn keyboard_scaling(note: u8, ks: &KeyboardLevelScaling) -> i32 {
    let x = i32::from(note) - (i32::from(ks.break_point) + BREAK_POINT_OFFSET);
    let (curve, depth) = if x > 0 {
        (ks.right_curve, ks.right_depth)
    } else {
        (ks.left_curve, ks.left_depth)
    };

    let mut t = x.abs().min(MAX_KEYBOARD_SCALING);
    if curve.is_exponential() {
        t = t * t * t / (MAX_KEYBOARD_SCALING * MAX_KEYBOARD_SCALING);
    }

    let amount = t * i32::from(depth) / 99;

    if curve.is_positive() {
        amount
    } else {
        -amount
    }
}

/// Output level of an operator for one note, 0 to 508.
#[inline]
pub fn output_scale(tables: &Tables, op: &OperatorParams, note: u8, velocity: u8) -> u32 {
    let level = i32::from(tables.level_scale[op.output_level as usize % tables.level_scale.len()])
        + keyboard_scaling(note, &op.keyboard_level_scaling)
        - velocity_reduction(velocity, op.velocity_sensitivity);

    (level.clamp(0, 127) as u32) << 2
}

/// Combines an envelope level (integer units) with the output scale into the
/// attenuation fed to the sine reconstruction.
#[inline]
pub fn attenuation(envelope: u32, output_scale: u32) -> u32 {
    let loudness = ENVELOPE_MAX - envelope.min(ENVELOPE_MAX);

    ENVELOPE_MAX - ((loudness * output_scale) >> ENVELOPE_BITS)
}

/// Scales the feedback register by the patch feedback amount (0 to 7).
#[inline]
pub fn feedback_modulation(feedback: i32, amount: u8) -> i32 {
    if amount == 0 {
        0
    } else {
        feedback >> (FEEDBACK_BITS - u32::from(amount.min(7)))
    }
}
