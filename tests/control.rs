//! Tests for the control context.

use std::thread;

use dx_fm_synth::config::BLOCK_SIZE;
use dx_fm_synth::{Config, ConfigError, Error, MidiMessage, Rejected, Synth, VoiceParams};

fn render_block(synth: &mut Synth) {
    let mut out = vec![0; BLOCK_SIZE * synth.config().output_channels];
    synth.render(&mut out);
}

fn active_notes(synth: &Synth) -> Vec<u8> {
    synth
        .voices()
        .iter()
        .filter(|voice| voice.is_gated())
        .map(|voice| voice.note())
        .collect()
}

#[test]
fn notes_take_effect_at_the_next_block() {
    let mut synth = Synth::new(Config::default()).unwrap();
    let controller = synth.controller();

    controller.assign_key(60, 100).unwrap();
    controller.assign_key(64, 100).unwrap();
    assert!(active_notes(&synth).is_empty());

    render_block(&mut synth);
    assert_eq!(active_notes(&synth), [60, 64]);

    controller.release_key(60, 0).unwrap();
    render_block(&mut synth);
    assert_eq!(active_notes(&synth), [64]);
    assert!(synth.voices()[0].is_releasing());
}

#[test]
fn out_of_range_values_are_not_queued() {
    let mut synth = Synth::new(Config::default()).unwrap();
    let controller = synth.controller();

    assert!(matches!(
        controller.assign_key(128, 100),
        Err(Error::Range { parameter: "note", .. })
    ));
    assert!(controller.release_key(60, 128).is_err());

    render_block(&mut synth);
    assert!(active_notes(&synth).is_empty());
}

#[test]
fn parse_note_messages() {
    assert_eq!(
        MidiMessage::parse(&[0x93, 60, 100]).unwrap(),
        MidiMessage::NoteOn {
            channel: 3,
            note: 60,
            velocity: 100
        }
    );
    assert_eq!(
        MidiMessage::parse(&[0x80, 60, 64]).unwrap(),
        MidiMessage::NoteOff {
            channel: 0,
            note: 60,
            velocity: 64
        }
    );
    assert_eq!(
        MidiMessage::parse(&[0x9f, 61, 0]).unwrap(),
        MidiMessage::NoteOff {
            channel: 15,
            note: 61,
            velocity: 0
        }
    );
}

#[test]
fn parse_rejects_other_messages() {
    assert!(matches!(
        MidiMessage::parse(&[0xb0, 7, 100]),
        Err(Error::UnsupportedMidi {
            status: 0xb0,
            len: 3
        })
    ));
    assert!(matches!(
        MidiMessage::parse(&[0x90, 60]),
        Err(Error::UnsupportedMidi {
            status: 0x90,
            len: 2
        })
    ));
    assert!(matches!(
        MidiMessage::parse(&[]),
        Err(Error::UnsupportedMidi { status: 0, len: 0 })
    ));
    assert!(matches!(
        MidiMessage::parse(&[0x90, 60, 100, 0]),
        Err(Error::UnsupportedMidi { len: 4, .. })
    ));
    assert!(matches!(
        MidiMessage::parse(&[0x90, 0x80, 100]),
        Err(Error::Range { parameter: "note", .. })
    ));
}

#[test]
fn midi_plays_the_engine() {
    let mut synth = Synth::new(Config::default()).unwrap();
    let controller = synth.controller();

    controller.handle_midi(&[0x90, 60, 100]).unwrap();
    controller.handle_midi(&[0x90, 67, 100]).unwrap();
    render_block(&mut synth);
    assert_eq!(active_notes(&synth), [60, 67]);

    controller.handle_midi(&[0x90, 60, 0]).unwrap();
    controller.handle_midi(&[0x85, 67, 30]).unwrap();
    render_block(&mut synth);
    assert!(active_notes(&synth).is_empty());

    assert!(controller.handle_midi(&[0xe0, 0, 64]).is_err());
}

#[test]
fn full_queue_is_reported() {
    let synth = Synth::new(Config {
        command_capacity: 2,
        ..Default::default()
    })
    .unwrap();
    let controller = synth.controller();

    controller.assign_key(60, 100).unwrap();
    controller.assign_key(62, 100).unwrap();

    assert!(matches!(controller.assign_key(64, 100), Err(Error::QueueFull)));
}

#[test]
fn rejected_notes_come_back() {
    let mut synth = Synth::new(Config {
        num_voices: 1,
        ..Default::default()
    })
    .unwrap();
    let controller = synth.controller();

    controller.assign_key(60, 100).unwrap();
    controller.assign_key(62, 90).unwrap();
    render_block(&mut synth);

    assert_eq!(active_notes(&synth), [60]);

    let rejected = controller.poll_rejection().unwrap();
    assert_eq!(
        rejected,
        Rejected::Capacity {
            note: 62,
            velocity: 90
        }
    );
    assert!(matches!(Error::from(rejected), Error::Capacity { note: 62 }));
    assert_eq!(controller.poll_rejection(), None);
}

#[test]
fn all_notes_off_releases_everything() {
    let mut synth = Synth::new(Config::default()).unwrap();
    let controller = synth.controller();

    for note in [48, 52, 55, 59] {
        controller.assign_key(note, 100).unwrap();
    }
    render_block(&mut synth);
    assert_eq!(active_notes(&synth).len(), 4);

    controller.all_notes_off().unwrap();
    render_block(&mut synth);

    assert!(active_notes(&synth).is_empty());
    assert!(synth.voices().iter().take(4).all(|voice| voice.is_releasing()));
}

#[test]
fn patches_are_validated_before_queueing() {
    let mut synth = Synth::new(Config::default()).unwrap();
    let controller = synth.controller();

    let mut invalid = VoiceParams::default();
    invalid.algorithm = 40;
    assert!(matches!(
        controller.select_patch(invalid),
        Err(Error::Configuration(ConfigError::InvalidAlgorithm(40)))
    ));

    let mut patch = VoiceParams::default();
    patch.algorithm = 12;
    patch.set_name("QUEUED");
    controller.select_patch(patch.clone()).unwrap();

    assert_eq!(synth.patch(), &VoiceParams::default());
    render_block(&mut synth);
    assert_eq!(synth.patch(), &patch);
}

#[test]
fn commands_apply_in_order() {
    let mut synth = Synth::new(Config::default()).unwrap();
    let controller = synth.controller();

    let mut patch = VoiceParams::default();
    patch.algorithm = 7;

    controller.assign_key(60, 100).unwrap();
    controller.select_patch(patch).unwrap();
    controller.assign_key(62, 100).unwrap();
    render_block(&mut synth);

    let tables = synth.tables();
    assert_eq!(synth.voices()[0].algorithm(), tables.algorithm(0));
    assert_eq!(synth.voices()[1].algorithm(), tables.algorithm(7));
}

#[test]
fn controllers_work_from_other_threads() {
    let mut synth = Synth::new(Config::default()).unwrap();

    let handles: Vec<_> = [40u8, 50, 60, 70]
        .into_iter()
        .map(|base| {
            let controller = synth.controller();
            thread::spawn(move || {
                for note in base..base + 3 {
                    controller.assign_key(note, 100).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    render_block(&mut synth);

    let mut notes = active_notes(&synth);
    notes.sort_unstable();
    assert_eq!(notes, [40, 41, 42, 50, 51, 52, 60, 61, 62, 70, 71, 72]);
}
