//! DX7 voice parameters.
//!
//! Every field keeps the small integer encoding of the DX7 voice data so that
//! a bank can be decoded and re-encoded without loss. Values are checked once,
//! when a patch enters the engine, never on the render path.

use crate::error::{check_range, ConfigError, Error, Result};

use super::{NUM_ALGORITHMS, NUM_OPERATORS};

/// Size of a voice in the 32-voice bulk dump format.
pub const PACKED_VOICE_SIZE: usize = 128;

/// Length of a voice name.
pub const NAME_LENGTH: usize = 10;

const PACKED_OPERATOR_SIZE: usize = 17;
const PACKED_GLOBALS: usize = NUM_OPERATORS * PACKED_OPERATOR_SIZE;

/// Four rate/level pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeParams {
    pub rate: [u8; 4],
    pub level: [u8; 4],
}

/// Keyboard level scaling curve, on either side of the break point.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    #[default]
    NegativeLinear,
    NegativeExponential,
    PositiveExponential,
    PositiveLinear,
}

impl Curve {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::NegativeLinear,
            1 => Self::NegativeExponential,
            2 => Self::PositiveExponential,
            _ => Self::PositiveLinear,
        }
    }

    fn bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_exponential(self) -> bool {
        matches!(self, Self::NegativeExponential | Self::PositiveExponential)
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        matches!(self, Self::PositiveExponential | Self::PositiveLinear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardLevelScaling {
    /// 0 is A-1, 39 is C3.
    pub break_point: u8,
    pub left_depth: u8,
    pub right_depth: u8,
    pub left_curve: Curve,
    pub right_curve: Curve,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorMode {
    /// Frequency follows the note, scaled by coarse and fine.
    #[default]
    Ratio,
    /// Frequency ignores the note.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscillatorParams {
    pub mode: OscillatorMode,
    pub coarse: u8,
    pub fine: u8, // x frequency by 1 + 0.01 x fine
    /// -7..=7, stored as 0..=14.
    pub detune: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorParams {
    pub envelope: EnvelopeParams,
    pub keyboard_level_scaling: KeyboardLevelScaling,
    pub rate_scaling: u8,
    pub amp_mod_sensitivity: u8,
    pub velocity_sensitivity: u8,
    pub output_level: u8,
    pub oscillator: OscillatorParams,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Triangle,
    SawDown,
    SawUp,
    Square,
    Sine,
    SampleAndHold,
}

impl Waveform {
    fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0 => Self::Triangle,
            1 => Self::SawDown,
            2 => Self::SawUp,
            3 => Self::Square,
            4 => Self::Sine,
            5 => Self::SampleAndHold,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfoParams {
    pub speed: u8,
    pub delay: u8,
    pub pitch_mod_depth: u8,
    pub amp_mod_depth: u8,
    pub key_sync: bool,
    pub waveform: Waveform,
    pub pitch_mod_sensitivity: u8,
}

/// A complete patch. `operators[0]` is operator 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceParams {
    pub operators: [OperatorParams; NUM_OPERATORS],
    pub pitch_envelope: EnvelopeParams,
    pub lfo: LfoParams,
    /// Zero-based row of the routing table.
    pub algorithm: u8,
    pub feedback: u8,
    pub oscillator_key_sync: bool,
    /// 24 is no transposition.
    pub transpose: u8,
    pub name: [u8; NAME_LENGTH],
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            rate: [99; 4],
            level: [99, 99, 99, 0],
        }
    }
}

impl Default for KeyboardLevelScaling {
    fn default() -> Self {
        Self {
            break_point: 39,
            left_depth: 0,
            right_depth: 0,
            left_curve: Curve::NegativeLinear,
            right_curve: Curve::NegativeLinear,
        }
    }
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            mode: OscillatorMode::Ratio,
            coarse: 1,
            fine: 0,
            detune: 7,
        }
    }
}

impl Default for OperatorParams {
    fn default() -> Self {
        Self {
            envelope: EnvelopeParams::default(),
            keyboard_level_scaling: KeyboardLevelScaling::default(),
            rate_scaling: 0,
            amp_mod_sensitivity: 0,
            velocity_sensitivity: 0,
            output_level: 0,
            oscillator: OscillatorParams::default(),
        }
    }
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            speed: 35,
            delay: 0,
            pitch_mod_depth: 0,
            amp_mod_depth: 0,
            key_sync: true,
            waveform: Waveform::Triangle,
            pitch_mod_sensitivity: 3,
        }
    }
}

/// The DX7 "INIT VOICE": operator 1 alone at full level, algorithm 1.
impl Default for VoiceParams {
    fn default() -> Self {
        let mut operators = [OperatorParams::default(); NUM_OPERATORS];
        operators[0].output_level = 99;

        Self {
            operators,
            pitch_envelope: EnvelopeParams {
                rate: [99; 4],
                level: [50; 4],
            },
            lfo: LfoParams::default(),
            algorithm: 0,
            feedback: 0,
            oscillator_key_sync: true,
            transpose: 24,
            name: *b"INIT VOICE",
        }
    }
}

impl EnvelopeParams {
    fn validate(&self, rate: &'static str, level: &'static str) -> Result<()> {
        for (&r, &l) in self.rate.iter().zip(self.level.iter()) {
            check_range(rate, r, 99)?;
            check_range(level, l, 99)?;
        }

        Ok(())
    }
}

impl OperatorParams {
    pub fn validate(&self) -> Result<()> {
        self.envelope
            .validate("operator.envelope.rate", "operator.envelope.level")?;

        let ks = &self.keyboard_level_scaling;
        check_range("operator.break_point", ks.break_point, 99)?;
        check_range("operator.left_depth", ks.left_depth, 99)?;
        check_range("operator.right_depth", ks.right_depth, 99)?;

        check_range("operator.rate_scaling", self.rate_scaling, 7)?;
        check_range("operator.amp_mod_sensitivity", self.amp_mod_sensitivity, 3)?;
        check_range("operator.velocity_sensitivity", self.velocity_sensitivity, 7)?;
        check_range("operator.output_level", self.output_level, 99)?;

        check_range("operator.coarse", self.oscillator.coarse, 31)?;
        check_range("operator.fine", self.oscillator.fine, 99)?;
        check_range("operator.detune", self.oscillator.detune, 14)?;

        Ok(())
    }
}

impl VoiceParams {
    /// Checks every field against its documented domain.
    ///
    /// An out-of-range algorithm is a configuration error; every other field
    /// reports [`Error::Range`].
    pub fn validate(&self) -> Result<()> {
        if usize::from(self.algorithm) >= NUM_ALGORITHMS {
            return Err(ConfigError::InvalidAlgorithm(self.algorithm).into());
        }

        for op in &self.operators {
            op.validate()?;
        }

        self.pitch_envelope
            .validate("pitch_envelope.rate", "pitch_envelope.level")?;

        check_range("lfo.speed", self.lfo.speed, 99)?;
        check_range("lfo.delay", self.lfo.delay, 99)?;
        check_range("lfo.pitch_mod_depth", self.lfo.pitch_mod_depth, 99)?;
        check_range("lfo.amp_mod_depth", self.lfo.amp_mod_depth, 99)?;
        check_range("lfo.pitch_mod_sensitivity", self.lfo.pitch_mod_sensitivity, 7)?;

        check_range("feedback", self.feedback, 7)?;
        check_range("transpose", self.transpose, 48)?;

        for &c in &self.name {
            check_range("name", c, 0x7f)?;
        }

        Ok(())
    }

    /// Decodes a voice from the packed 128-byte bulk dump layout.
    ///
    /// Operators are stored from 6 down to 1. Sub-byte fields are masked to
    /// their width; values outside the parameter domain are rejected.
    pub fn unpack(data: &[u8; PACKED_VOICE_SIZE]) -> Result<Self> {
        let mut voice = Self::default();

        for (i, op_data) in data[..PACKED_GLOBALS]
            .chunks_exact(PACKED_OPERATOR_SIZE)
            .enumerate()
        {
            let op = &mut voice.operators[NUM_OPERATORS - 1 - i];

            for j in 0..4 {
                op.envelope.rate[j] = op_data[j] & 0x7f;
                op.envelope.level[j] = op_data[4 + j] & 0x7f;
            }

            op.keyboard_level_scaling = KeyboardLevelScaling {
                break_point: op_data[8] & 0x7f,
                left_depth: op_data[9] & 0x7f,
                right_depth: op_data[10] & 0x7f,
                left_curve: Curve::from_bits(op_data[11]),
                right_curve: Curve::from_bits(op_data[11] >> 2),
            };

            op.rate_scaling = op_data[12] & 0x07;
            op.amp_mod_sensitivity = op_data[13] & 0x03;
            op.velocity_sensitivity = (op_data[13] >> 2) & 0x07;
            op.output_level = op_data[14] & 0x7f;

            op.oscillator = OscillatorParams {
                mode: if op_data[15] & 0x01 == 0 {
                    OscillatorMode::Ratio
                } else {
                    OscillatorMode::Fixed
                },
                coarse: (op_data[15] >> 1) & 0x1f,
                fine: op_data[16] & 0x7f,
                detune: (op_data[12] >> 3) & 0x0f,
            };
        }

        let globals = &data[PACKED_GLOBALS..];

        for j in 0..4 {
            voice.pitch_envelope.rate[j] = globals[j] & 0x7f;
            voice.pitch_envelope.level[j] = globals[4 + j] & 0x7f;
        }

        voice.algorithm = globals[8] & 0x1f;
        voice.feedback = globals[9] & 0x07;
        voice.oscillator_key_sync = globals[9] & 0x08 != 0;

        voice.lfo = LfoParams {
            speed: globals[10] & 0x7f,
            delay: globals[11] & 0x7f,
            pitch_mod_depth: globals[12] & 0x7f,
            amp_mod_depth: globals[13] & 0x7f,
            key_sync: globals[14] & 0x01 != 0,
            waveform: Waveform::from_bits((globals[14] >> 1) & 0x07).ok_or(Error::Range {
                parameter: "lfo.waveform",
                value: ((globals[14] >> 1) & 0x07).into(),
                max: Waveform::SampleAndHold as u32,
            })?,
            pitch_mod_sensitivity: (globals[14] >> 4) & 0x07,
        };

        voice.transpose = globals[15] & 0x7f;

        for (c, &byte) in voice.name.iter_mut().zip(&globals[16..]) {
            *c = byte & 0x7f;
        }

        voice.validate()?;

        Ok(voice)
    }

    /// Encodes the voice into the packed 128-byte bulk dump layout.
    pub fn pack(&self) -> [u8; PACKED_VOICE_SIZE] {
        let mut data = [0; PACKED_VOICE_SIZE];

        for (i, op_data) in data[..PACKED_GLOBALS]
            .chunks_exact_mut(PACKED_OPERATOR_SIZE)
            .enumerate()
        {
            let op = &self.operators[NUM_OPERATORS - 1 - i];
            let ks = &op.keyboard_level_scaling;

            op_data[..4].copy_from_slice(&op.envelope.rate);
            op_data[4..8].copy_from_slice(&op.envelope.level);
            op_data[8] = ks.break_point;
            op_data[9] = ks.left_depth;
            op_data[10] = ks.right_depth;
            op_data[11] = (ks.right_curve.bits() << 2) | ks.left_curve.bits();
            op_data[12] = (op.oscillator.detune << 3) | op.rate_scaling;
            op_data[13] = (op.velocity_sensitivity << 2) | op.amp_mod_sensitivity;
            op_data[14] = op.output_level;
            op_data[15] = (op.oscillator.coarse << 1) | op.oscillator.mode as u8;
            op_data[16] = op.oscillator.fine;
        }

        let globals = &mut data[PACKED_GLOBALS..];

        globals[..4].copy_from_slice(&self.pitch_envelope.rate);
        globals[4..8].copy_from_slice(&self.pitch_envelope.level);
        globals[8] = self.algorithm;
        globals[9] = (u8::from(self.oscillator_key_sync) << 3) | self.feedback;
        globals[10] = self.lfo.speed;
        globals[11] = self.lfo.delay;
        globals[12] = self.lfo.pitch_mod_depth;
        globals[13] = self.lfo.amp_mod_depth;
        globals[14] = (self.lfo.pitch_mod_sensitivity << 4)
            | ((self.lfo.waveform as u8) << 1)
            | u8::from(self.lfo.key_sync);
        globals[15] = self.transpose;
        globals[16..].copy_from_slice(&self.name);

        data
    }

    /// The voice name with trailing padding removed.
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).trim_end().to_string()
    }

    /// Sets the name, padding with spaces and cutting after 10 characters.
    pub fn set_name(&mut self, name: &str) {
        let mut bytes = name.bytes().filter(u8::is_ascii);
        for c in self.name.iter_mut() {
            *c = bytes.next().unwrap_or(b' ');
        }
    }
}
