//! Tests for the 32-voice bank format.

use dx_fm_synth::fm::patch::VoiceParams;
use dx_fm_synth::fm::sysex::{checksum, Bank, BANK_SIZE, SYSEX_SIZE};
use dx_fm_synth::{ConfigError, Error};

fn bank() -> Bank {
    let voices = (0..BANK_SIZE)
        .map(|i| {
            let mut voice = VoiceParams::default();
            voice.algorithm = i as u8;
            voice.feedback = (i % 8) as u8;
            voice.operators[1].output_level = (i * 3) as u8;
            voice.set_name(&format!("VOICE {i}"));
            voice
        })
        .collect();

    Bank::from_voices(voices).unwrap()
}

fn malformed(data: &[u8]) -> &'static str {
    match Bank::from_syx(data) {
        Err(Error::Configuration(ConfigError::MalformedBank(reason))) => reason,
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn message_layout() {
    let data = bank().to_syx(3);

    assert_eq!(data.len(), SYSEX_SIZE);
    assert_eq!(&data[..6], &[0xf0, 0x43, 0x03, 0x09, 0x20, 0x00]);
    assert_eq!(data[SYSEX_SIZE - 1], 0xf7);
    assert_eq!(data[SYSEX_SIZE - 2], checksum(&data[6..SYSEX_SIZE - 2]));
}

#[test]
fn checksum_completes_the_sum() {
    let data = bank().to_syx(0);
    let payload = &data[6..SYSEX_SIZE - 1];

    let sum = payload.iter().fold(0u8, |sum, &b| sum.wrapping_add(b));
    assert_eq!(sum & 0x7f, 0);

    assert_eq!(checksum(&[]), 0);
    assert_eq!(checksum(&[1]), 0x7f);
    assert_eq!(checksum(&[0x40, 0x40]), 0);
}

#[test]
fn encode_and_decode() {
    let bank = bank();
    let decoded = Bank::from_syx(&bank.to_syx(0)).unwrap();

    assert_eq!(decoded, bank);
    assert_eq!(decoded.voices().len(), BANK_SIZE);
}

#[test]
fn channel_is_ignored() {
    let a = Bank::from_syx(&bank().to_syx(0)).unwrap();
    let b = Bank::from_syx(&bank().to_syx(15)).unwrap();

    assert_eq!(a, b);
}

#[test]
fn lookup() {
    let bank = bank();

    assert_eq!(bank.voice(7).unwrap().algorithm, 7);
    assert!(bank.voice(BANK_SIZE).is_none());
    assert_eq!(bank.find("VOICE 12").unwrap().algorithm, 12);
    assert_eq!(bank.find("VOICE 12   ").unwrap().algorithm, 12);
    assert!(bank.find("MISSING").is_none());
    assert_eq!(bank.names().next().as_deref(), Some("VOICE 0"));
}

#[test]
fn rejects_malformed_messages() {
    let good = bank().to_syx(0);

    assert_eq!(malformed(&good[..SYSEX_SIZE - 1]), "unexpected message length");

    let mut data = good.clone();
    data[0] = 0x90;
    assert_eq!(malformed(&data), "missing sysex start");

    let mut data = good.clone();
    data[1] = 0x41;
    assert_eq!(malformed(&data), "not a Yamaha message");

    let mut data = good.clone();
    data[2] = 0x10;
    assert_eq!(malformed(&data), "not a bulk dump");

    let mut data = good.clone();
    data[3] = 0x00;
    assert_eq!(malformed(&data), "not a 32-voice bank");

    let mut data = good.clone();
    data[5] = 0x01;
    assert_eq!(malformed(&data), "unexpected byte count");

    let mut data = good.clone();
    data[100] ^= 0x01;
    assert_eq!(malformed(&data), "checksum mismatch");

    let mut data = good;
    data[SYSEX_SIZE - 1] = 0xf0;
    assert_eq!(malformed(&data), "missing sysex end");
}

#[test]
fn rejects_out_of_range_voice_data() {
    let mut data = bank().to_syx(0);

    // Detune of operator 6 in the first voice.
    data[6 + 12] = 15 << 3;
    let end = SYSEX_SIZE - 2;
    data[end] = checksum(&data[6..end]);

    assert!(matches!(
        Bank::from_syx(&data),
        Err(Error::Range {
            parameter: "operator.detune",
            ..
        })
    ));
}

#[test]
fn bank_holds_32_voices() {
    assert!(matches!(
        Bank::from_voices(vec![VoiceParams::default(); 31]),
        Err(Error::Configuration(ConfigError::MalformedBank(_)))
    ));

    let mut voices = vec![VoiceParams::default(); BANK_SIZE];
    voices[3].feedback = 9;
    assert!(Bank::from_voices(voices).is_err());
}
