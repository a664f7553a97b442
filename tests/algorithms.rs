//! Tests for the algorithm routing graph.

use dx_fm_synth::fm::algorithms::{Algorithm, FeedbackPath, MASTER_OUTPUT, ROUTING};
use dx_fm_synth::ConfigError;

const OUT: u8 = MASTER_OUTPUT;

#[test]
fn every_dx7_row_compiles() {
    for (index, row) in ROUTING.iter().enumerate() {
        assert!(
            Algorithm::compile(index, row).is_ok(),
            "algorithm {}",
            index + 1
        );
    }
}

#[test]
fn algorithm_one_stacks() {
    let algorithm = Algorithm::compile(0, &ROUTING[0]).unwrap();

    assert_eq!(algorithm.carriers().collect::<Vec<_>>(), [0, 2]);
    assert_eq!(algorithm.route(1).modulates, 0b000001);
    assert_eq!(algorithm.route(5).modulates, 0b010000);
    assert!(algorithm.is_modulator(5));
    assert!(!algorithm.is_modulator(0));
    assert_eq!(
        algorithm.feedback(),
        Some(FeedbackPath {
            source: 5,
            destination: 5
        })
    );
}

#[test]
fn algorithm_four_feeds_back_across_operators() {
    let feedback = Algorithm::compile(3, &ROUTING[3])
        .unwrap()
        .feedback()
        .unwrap();

    assert_eq!(feedback.source, 3);
    assert_eq!(feedback.destination, 5);
    assert!(!feedback.is_self());
}

#[test]
fn algorithm_thirty_two_is_additive() {
    let algorithm = Algorithm::compile(31, &ROUTING[31]).unwrap();

    assert_eq!(algorithm.carriers().count(), 6);
    assert!((0..6).all(|op| algorithm.route(op).modulates == 0));
    assert!(algorithm.feedback().unwrap().is_self());
}

#[test]
fn modulation_only_flows_downwards() {
    for (index, row) in ROUTING.iter().enumerate() {
        let algorithm = Algorithm::compile(index, row).unwrap();
        for op in 0..6 {
            assert_eq!(algorithm.route(op).modulates >> op, 0);
        }
    }
}

#[test]
fn rejects_two_lagged_edges() {
    let row = [OUT, 0x01 | 0x02, OUT | 0x08, 0x04, 0x08, 0x10];

    assert!(matches!(
        Algorithm::compile(7, &row),
        Err(ConfigError::MalformedRouting { algorithm: 7, .. })
    ));
}

#[test]
fn rejects_silent_rows_and_reserved_bits() {
    assert!(Algorithm::compile(0, &[0x01, 0, 0, 0, 0, 0]).is_err());
    assert!(Algorithm::compile(0, &[OUT | 0x80, 0, 0, 0, 0, 0]).is_err());
}
