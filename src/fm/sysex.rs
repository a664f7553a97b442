//! DX7 32-voice bulk dump.
//!
//! Layout: `F0 43 0n 09 20 00`, 32 packed voices of 128 bytes, a 7-bit two's
//! complement checksum of the voice data, `F7`. The channel nibble is ignored.

use crate::error::{ConfigError, Result};

use super::patch::{VoiceParams, PACKED_VOICE_SIZE};

/// Voices in a bank.
pub const BANK_SIZE: usize = 32;

/// Bytes of voice data in a bank.
pub const BANK_DATA_SIZE: usize = BANK_SIZE * PACKED_VOICE_SIZE;

/// Size of a complete bulk dump message.
pub const SYSEX_SIZE: usize = HEADER_SIZE + BANK_DATA_SIZE + 2;

const HEADER_SIZE: usize = 6;

const STATUS_START: u8 = 0xf0;
const STATUS_END: u8 = 0xf7;
const ID_YAMAHA: u8 = 0x43;
const FORMAT_32_VOICES: u8 = 0x09;

/// A decoded bank of 32 voices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    voices: Vec<VoiceParams>,
}

impl Bank {
    /// Decodes a complete bulk dump message.
    pub fn from_syx(data: &[u8]) -> Result<Self> {
        if data.len() != SYSEX_SIZE {
            return Err(ConfigError::MalformedBank("unexpected message length").into());
        }

        let (header, rest) = data.split_at(HEADER_SIZE);
        let (payload, trailer) = rest.split_at(BANK_DATA_SIZE);

        if header[0] != STATUS_START {
            return Err(ConfigError::MalformedBank("missing sysex start").into());
        }
        if header[1] & 0x7f != ID_YAMAHA {
            return Err(ConfigError::MalformedBank("not a Yamaha message").into());
        }
        if header[2] & 0x70 != 0 {
            return Err(ConfigError::MalformedBank("not a bulk dump").into());
        }
        if header[3] & 0x7f != FORMAT_32_VOICES {
            return Err(ConfigError::MalformedBank("not a 32-voice bank").into());
        }
        let byte_count = (usize::from(header[4] & 0x7f) << 7) | usize::from(header[5] & 0x7f);
        if byte_count != BANK_DATA_SIZE {
            return Err(ConfigError::MalformedBank("unexpected byte count").into());
        }
        if checksum(payload) != trailer[0] & 0x7f {
            return Err(ConfigError::MalformedBank("checksum mismatch").into());
        }
        if trailer[1] != STATUS_END {
            return Err(ConfigError::MalformedBank("missing sysex end").into());
        }

        let voices = payload
            .chunks_exact(PACKED_VOICE_SIZE)
            .map(|chunk| {
                let mut packed = [0; PACKED_VOICE_SIZE];
                packed.copy_from_slice(chunk);
                VoiceParams::unpack(&packed)
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!("Decoded patch bank with {} voices", voices.len());

        Ok(Self { voices })
    }

    /// Builds a bank from exactly 32 voices.
    pub fn from_voices(voices: Vec<VoiceParams>) -> Result<Self> {
        if voices.len() != BANK_SIZE {
            return Err(ConfigError::MalformedBank("a bank holds 32 voices").into());
        }
        for voice in &voices {
            voice.validate()?;
        }

        Ok(Self { voices })
    }

    /// Encodes the bank as a bulk dump message for a MIDI channel (0 to 15).
    pub fn to_syx(&self, channel: u8) -> Vec<u8> {
        let mut data = Vec::with_capacity(SYSEX_SIZE);

        data.extend_from_slice(&[
            STATUS_START,
            ID_YAMAHA,
            channel & 0x0f,
            FORMAT_32_VOICES,
            (BANK_DATA_SIZE >> 7) as u8,
            (BANK_DATA_SIZE & 0x7f) as u8,
        ]);
        for voice in &self.voices {
            data.extend_from_slice(&voice.pack());
        }
        data.push(checksum(&data[HEADER_SIZE..]));
        data.push(STATUS_END);

        data
    }

    #[inline]
    pub fn voice(&self, index: usize) -> Option<&VoiceParams> {
        self.voices.get(index)
    }

    /// Looks a voice up by name, ignoring trailing padding.
    pub fn find(&self, name: &str) -> Option<&VoiceParams> {
        let name = name.trim_end();
        self.voices.iter().find(|voice| voice.name_str() == name)
    }

    #[inline]
    pub fn voices(&self) -> &[VoiceParams] {
        &self.voices
    }

    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.voices.iter().map(VoiceParams::name_str)
    }
}

/// 7-bit two's complement checksum.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |sum, &byte| sum.wrapping_sub(byte))
        & 0x7f
}
