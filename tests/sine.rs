//! Tests for the quarter-wave sine reconstruction.

use proptest::prelude::*;

use dx_fm_synth::fm::sine::{log_sine, sample, ANGLE_SHIFT};
use dx_fm_synth::resources::{Tables, SIGN_FLAG};

const CYCLE: u32 = 1 << 24;
const HALF_CYCLE: u32 = CYCLE / 2;

const PEAK: i32 = ((1024 + 1018) << 1) << 14;

#[test]
fn log_sine_quadrants() {
    let tables = Tables::builtin().unwrap();
    let table = tables.log_sine();

    // Rising quarter, falling quarter, then the same tagged negative.
    assert_eq!(log_sine(&tables, 0), table[0]);
    assert_eq!(log_sine(&tables, 255), table[255]);
    assert_eq!(log_sine(&tables, 256), table[255]);
    assert_eq!(log_sine(&tables, 511), table[0]);
    assert_eq!(log_sine(&tables, 512), table[0] | SIGN_FLAG);
    assert_eq!(log_sine(&tables, 768), table[255] | SIGN_FLAG);
    assert_eq!(log_sine(&tables, 1023), table[0] | SIGN_FLAG);

    // Only the two quadrant bits above the index matter.
    assert_eq!(log_sine(&tables, 1024 + 100), log_sine(&tables, 100));
}

#[test]
fn peak_amplitude() {
    let tables = Tables::builtin().unwrap();
    let quarter = 255 << ANGLE_SHIFT;

    assert_eq!(sample(&tables, quarter, 0), PEAK);
    assert_eq!(sample(&tables, quarter + HALF_CYCLE, 0), -PEAK);
}

#[test]
fn zero_crossings_are_near_zero() {
    let tables = Tables::builtin().unwrap();

    let start = sample(&tables, 0, 0);
    assert!(start > 0);
    assert!(start < PEAK / 100);

    let middle = sample(&tables, HALF_CYCLE, 0);
    assert!(middle < 0);
    assert!(middle > -PEAK / 100);
}

#[test]
fn full_attenuation_is_silent() {
    let tables = Tables::builtin().unwrap();

    for phase in (0..CYCLE).step_by(4099) {
        assert_eq!(sample(&tables, phase, 512), 0);
        assert_eq!(sample(&tables, phase, 10_000), 0);
    }
}

#[test]
fn attenuation_of_32_halves_the_amplitude() {
    let tables = Tables::builtin().unwrap();
    let quarter = 255 << ANGLE_SHIFT;

    assert_eq!(sample(&tables, quarter, 32), PEAK / 2);
    assert_eq!(sample(&tables, quarter, 64), PEAK / 4);

    // Elsewhere within the truncation of the shifted magnitude.
    for attenuation in [0, 17, 100, 200] {
        for phase in [0x12_3456, 0x40_0000, 0x9a_bcde] {
            let louder = sample(&tables, phase, attenuation);
            let quieter = sample(&tables, phase, attenuation + 32);

            assert!((quieter - louder / 2).abs() <= 1 << 13);
        }
    }
}

#[test]
fn amplitude_falls_with_attenuation() {
    let tables = Tables::builtin().unwrap();
    let quarter = 255 << ANGLE_SHIFT;

    let levels: Vec<i32> = (0..=512).map(|a| sample(&tables, quarter, a)).collect();

    assert!(levels.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn one_cycle_looks_like_a_sine() {
    let tables = Tables::builtin().unwrap();
    let steps = 1024;

    for i in 0..steps {
        let phase = i * (CYCLE / steps);
        let expected = (f64::from(phase) / f64::from(CYCLE) * std::f64::consts::TAU).sin();
        let actual = f64::from(sample(&tables, phase, 0)) / f64::from(PEAK);

        assert!(
            (actual - expected).abs() < 0.01,
            "phase {phase}: {actual} vs {expected}"
        );
    }
}

proptest! {
    #[test]
    fn sample_is_odd_symmetric(phase in any::<u32>(), attenuation in 0u32..=512) {
        prop_assert_eq!(
            sample(&tables(), phase, attenuation),
            -sample(&tables(), phase.wrapping_add(HALF_CYCLE), attenuation)
        );
    }

    #[test]
    fn sample_is_periodic(phase in any::<u32>(), attenuation in 0u32..=512) {
        prop_assert_eq!(
            sample(&tables(), phase, attenuation),
            sample(&tables(), phase.wrapping_add(CYCLE), attenuation)
        );
    }
}

fn tables() -> std::sync::Arc<Tables> {
    Tables::builtin().unwrap()
}
