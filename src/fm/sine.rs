//! Quarter-wave sine reconstruction in the log domain.
//!
//! A sample is computed as `exp(log_sine(phase) + attenuation)`, so scaling
//! by the envelope is an addition. Only one quadrant of `-log2(sin)` is
//! stored; the other three are mirrored and sign tagged.

use crate::resources::{
    Tables, EXP_SCALE_BITS, EXP_TABLE_BITS, LOG_FREQUENCY_BITS, LOG_SINE_BITS, SIGN_FLAG,
};

use super::dx_units::ENVELOPE_MAX;

/// Angle bits resolved by the log-sine lookup: a quadrant index plus two
/// quadrant bits.
pub const ANGLE_BITS: u32 = LOG_SINE_BITS + 2;

/// Phase bits dropped before the log-sine lookup.
pub const ANGLE_SHIFT: u32 = LOG_FREQUENCY_BITS - ANGLE_BITS;

/// Left shift of the reconstructed magnitude. Full scale is four cycles of
/// phase modulation.
pub const OUTPUT_SHIFT: u32 = 14;

const INDEX_MASK: u32 = (1 << LOG_SINE_BITS) - 1;
const EXP_MASK: u32 = (1 << EXP_TABLE_BITS) - 1;
const ATTENUATION_SHIFT: u32 = 3;

/// `-log2(|sin|)` of an angle in 1/256 octaves, tagged with [`SIGN_FLAG`] on
/// the negative half-wave.
#[inline]
pub fn log_sine(tables: &Tables, angle: u32) -> u16 {
    let index = angle & INDEX_MASK;
    let quadrant = (angle >> LOG_SINE_BITS) & 3;

    let index = if quadrant & 1 != 0 {
        index ^ INDEX_MASK
    } else {
        index
    };
    let value = tables.log_sine[index as usize];

    if quadrant & 2 != 0 {
        value | SIGN_FLAG
    } else {
        value
    }
}

/// Linear sample of a sine at `phase`, attenuated by `attenuation`
/// envelope units (0 is loudest, 512 and above is silent).
#[inline]
pub fn sample(tables: &Tables, phase: u32, attenuation: u32) -> i32 {
    let log_sine = u32::from(log_sine(tables, phase >> ANGLE_SHIFT));
    let negative = log_sine & u32::from(SIGN_FLAG) != 0;

    let log = (log_sine & !u32::from(SIGN_FLAG))
        + (attenuation.min(ENVELOPE_MAX) << ATTENUATION_SHIFT);

    let octaves = log >> EXP_TABLE_BITS;
    if octaves > EXP_SCALE_BITS + 1 {
        return 0;
    }

    let exp = u32::from(tables.exp[((log & EXP_MASK) ^ EXP_MASK) as usize]);
    let magnitude = (((1 << EXP_SCALE_BITS) + exp) << 1) >> octaves;
    let magnitude = (magnitude << OUTPUT_SHIFT) as i32;

    if negative {
        -magnitude
    } else {
        magnitude
    }
}
