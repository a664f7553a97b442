//! Tests for the operator envelope.

use proptest::prelude::*;

use dx_fm_synth::fm::dx_units::{envelope_increment, envelope_rate, envelope_target, ENVELOPE_MAX};
use dx_fm_synth::fm::envelope::{Envelope, Stage};
use dx_fm_synth::fm::patch::EnvelopeParams;
use dx_fm_synth::resources::Tables;

fn envelope(rate: [u8; 4], level: [u8; 4]) -> Envelope {
    let tables = Tables::builtin().unwrap();

    let mut envelope = Envelope::new();
    envelope.set(&tables, &EnvelopeParams { rate, level }, 0);
    envelope.start();

    envelope
}

fn render_until_sustain(envelope: &mut Envelope) {
    for _ in 0..1_000_000 {
        if envelope.stage() == Stage::Segment3 {
            return;
        }
        envelope.render(true);
    }
    panic!("sustain not reached");
}

#[test]
fn idle_envelope_is_silent() {
    let mut envelope = Envelope::new();

    assert!(envelope.is_off());
    assert_eq!(envelope.level(), ENVELOPE_MAX);
    assert_eq!(envelope.render(true), ENVELOPE_MAX);
    assert!(envelope.is_off());
}

#[test]
fn start_is_loudest() {
    let envelope = envelope([99; 4], [99, 99, 99, 0]);

    assert_eq!(envelope.stage(), Stage::Segment0);
    assert_eq!(envelope.level(), 0);
}

#[test]
fn rate_quantisation() {
    assert_eq!(envelope_rate(70, 0), 44);
    assert_eq!(envelope_rate(99, 0), 63);
    assert_eq!(envelope_rate(99, 27), 63);
    assert_eq!(envelope_rate(0, 3), 3);

    assert_eq!(envelope_increment(44), 8192);
    assert_eq!(envelope_increment(63), 229_376);
}

#[test]
fn first_segment_takes_640_steps() {
    let mut envelope = envelope([70, 99, 99, 99], [80, 80, 80, 0]);

    let mut previous = envelope.level();
    for _ in 0..639 {
        let level = envelope.render(true);
        assert!(level >= previous);
        previous = level;
    }

    assert_eq!(envelope.stage(), Stage::Segment0);
    assert_eq!(envelope.level(), 79);

    envelope.render(true);

    assert_eq!(envelope.stage(), Stage::Segment1);
    assert_eq!(envelope.level(), 80);
}

#[test]
fn segments_at_target_advance_immediately() {
    let mut envelope = envelope([70, 99, 99, 99], [80, 80, 80, 0]);

    for _ in 0..640 {
        envelope.render(true);
    }
    envelope.render(true);
    assert_eq!(envelope.stage(), Stage::Segment2);
    envelope.render(true);
    assert_eq!(envelope.stage(), Stage::Segment3);
}

#[test]
fn sustain_holds_while_gated() {
    let mut envelope = envelope([99; 4], [99, 70, 60, 0]);

    render_until_sustain(&mut envelope);
    let sustain = envelope.level();

    for _ in 0..10_000 {
        assert_eq!(envelope.render(true), sustain);
    }
    assert_eq!(envelope.stage(), Stage::Segment3);
}

#[test]
fn release_reaches_off() {
    let mut envelope = envelope([70, 99, 99, 99], [80, 80, 80, 0]);
    render_until_sustain(&mut envelope);

    let mut frames = 0;
    while !envelope.is_off() {
        envelope.render(false);
        frames += 1;
        assert!(frames <= 124);
    }

    assert_eq!(frames, 124);
    assert_eq!(envelope.level(), ENVELOPE_MAX);
}

#[test]
fn release_during_attack() {
    let mut envelope = envelope([20, 99, 99, 99], [80, 80, 80, 0]);

    for _ in 0..10 {
        envelope.render(true);
    }
    envelope.render(false);

    assert_eq!(envelope.stage(), Stage::Release);
}

#[test]
fn louder_release_level_switches_off() {
    let mut envelope = envelope([99; 4], [0, 0, 0, 99]);
    render_until_sustain(&mut envelope);

    envelope.render(false);

    assert!(envelope.is_off());
    assert_eq!(envelope.level(), ENVELOPE_MAX);
}

#[test]
fn audible_release_level_cuts_off() {
    let tables = Tables::builtin().unwrap();
    let mut envelope = envelope([99; 4], [99, 99, 99, 50]);
    render_until_sustain(&mut envelope);

    let floor = envelope_target(&tables, 50) >> 16;
    assert_eq!(floor, 200);

    let mut previous = envelope.level();
    for _ in 0..1000 {
        let level = envelope.render(false);
        if envelope.is_off() {
            break;
        }
        assert!(level >= previous && level < floor);
        previous = level;
    }

    assert!(envelope.is_off());
    assert!(previous > 100);
    assert_eq!(envelope.level(), ENVELOPE_MAX);
}

#[test]
fn louder_segments_step_faster_when_quiet() {
    let mut envelope = envelope([99, 50, 99, 99], [0, 99, 99, 0]);

    while envelope.stage() == Stage::Segment0 {
        envelope.render(true);
    }
    assert_eq!(envelope.level(), ENVELOPE_MAX);

    let before = envelope.fine_level();
    envelope.render(true);
    let first_step = before - envelope.fine_level();

    assert_eq!(first_step, 17 * 1024);

    while envelope.level() > 20 {
        envelope.render(true);
    }
    let before = envelope.fine_level();
    envelope.render(true);
    let late_step = before - envelope.fine_level();

    assert_eq!(late_step, 1024);
}

#[test]
fn rate_scaling_speeds_up_segments() {
    let tables = Tables::builtin().unwrap();
    let params = EnvelopeParams {
        rate: [40, 99, 99, 99],
        level: [50, 50, 50, 0],
    };

    let mut steps = [0; 2];
    for (scaling, steps) in [0, 8].into_iter().zip(steps.iter_mut()) {
        let mut envelope = Envelope::new();
        envelope.set(&tables, &params, scaling);
        envelope.start();

        while envelope.stage() == Stage::Segment0 {
            envelope.render(true);
            *steps += 1;
        }
    }

    assert!(steps[1] < steps[0]);
}

#[test]
fn identical_inputs_give_identical_levels() {
    let mut a = envelope([60, 40, 30, 50], [90, 50, 70, 0]);
    let mut b = envelope([60, 40, 30, 50], [90, 50, 70, 0]);

    for i in 0..50_000 {
        let gate = i < 20_000;
        assert_eq!(a.render(gate), b.render(gate));
        assert_eq!(a.fine_level(), b.fine_level());
        assert_eq!(a.stage(), b.stage());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn release_is_monotonic_and_bounded(rate in 40u8..=99, sustain in 0u8..=99) {
        let mut envelope = envelope([99, 99, 99, rate], [sustain, sustain, sustain, 0]);
        render_until_sustain(&mut envelope);

        let increment = envelope_increment(envelope_rate(rate, 0));
        let bound = ((ENVELOPE_MAX << 16) / increment) + 1;

        let mut previous = envelope.level();
        let mut frames = 0;
        while !envelope.is_off() {
            let level = envelope.render(false);
            prop_assert!(level >= previous);
            previous = level;

            frames += 1;
            prop_assert!(frames <= bound);
        }
    }
}
