//! DX-style operator envelope.
//!
//! The level is an attenuation: 0 is the loudest, [`ENVELOPE_MAX`] is silent.
//! It moves one step per sample towards the target of the active segment.
//! A couple of quirks of the DX-series envelopes are kept, namely:
//! - step sizes grow exponentially with the rate parameter.
//! - ascending segments (getting louder) take larger steps while the level is
//!   still quiet, giving the characteristic attack curve.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use super::dx_units::{
    envelope_increment, envelope_rate, envelope_target, ENVELOPE_FRACTION_BITS, ENVELOPE_MAX,
};
use super::patch::EnvelopeParams;
use crate::resources::Tables;

const NUM_SEGMENTS: usize = 4;
const RELEASE_SEGMENT: usize = NUM_SEGMENTS - 1;
const FINE_MAX: u32 = ENVELOPE_MAX << ENVELOPE_FRACTION_BITS;

// Ascending steps are multiplied by 1 + (level >> 21), up to 17x near silence.
const ATTACK_SHAPE_SHIFT: u32 = 21;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Rate 1 towards level 1.
    Segment0,
    /// Rate 2 towards level 2.
    Segment1,
    /// Rate 3 towards level 3.
    Segment2,
    /// Sustain at level 3 while the key is held.
    Segment3,
    /// Rate 4 towards level 4, entered when the key is released.
    Release,
    /// Finished. The operator contributes nothing.
    #[default]
    Off,
}

impl Stage {
    /// True while the key is held.
    #[inline]
    pub fn is_gated(self) -> bool {
        matches!(
            self,
            Self::Segment0 | Self::Segment1 | Self::Segment2 | Self::Segment3
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    stage: Stage,
    level: u32,

    increment: [u32; NUM_SEGMENTS],
    target: [u32; NUM_SEGMENTS],
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            stage: Stage::Off,
            level: FINE_MAX,

            increment: [0; NUM_SEGMENTS],
            target: [FINE_MAX; NUM_SEGMENTS],
        }
    }

    /// Latches rates and levels. `rate_scaling` is the keyboard rate scaling
    /// offset of the played note.
    pub fn set(&mut self, tables: &Tables, params: &EnvelopeParams, rate_scaling: u8) {
        for i in 0..NUM_SEGMENTS {
            self.increment[i] = envelope_increment(envelope_rate(params.rate[i], rate_scaling));
            self.target[i] = envelope_target(tables, params.level[i]);
        }
    }

    /// Restarts from the loudest level at the first segment.
    #[inline]
    pub fn start(&mut self) {
        self.stage = Stage::Segment0;
        self.level = 0;
    }

    /// Advances by one sample and returns the level in integer units.
    #[inline]
    pub fn render(&mut self, gate: bool) -> u32 {
        if !gate && self.stage.is_gated() {
            self.stage = Stage::Release;
        }

        let segment = match self.stage {
            Stage::Segment0 => 0,
            Stage::Segment1 => 1,
            Stage::Segment2 => 2,
            Stage::Release => RELEASE_SEGMENT,
            Stage::Segment3 | Stage::Off => return self.level(),
        };

        let target = self.target[segment];
        let increment = self.increment[segment];

        if target > self.level {
            self.level = (self.level + increment).min(target);
        } else if target < self.level {
            if self.stage == Stage::Release {
                // Release never gets louder.
                self.finish();
                return self.level();
            }
            let step = increment * (1 + (self.level >> ATTACK_SHAPE_SHIFT));
            self.level = self.level.saturating_sub(step).max(target);
        }

        if self.level == target {
            self.stage = match self.stage {
                Stage::Segment0 => Stage::Segment1,
                Stage::Segment1 => Stage::Segment2,
                Stage::Segment2 => Stage::Segment3,
                _ => {
                    // A non-zero release level is not held: the voice cuts
                    // to silence once it gets there.
                    self.finish();
                    Stage::Off
                }
            };
        }

        self.level()
    }

    #[inline]
    fn finish(&mut self) {
        self.stage = Stage::Off;
        self.level = FINE_MAX;
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Level in integer units, 0 to [`ENVELOPE_MAX`].
    #[inline]
    pub fn level(&self) -> u32 {
        self.level >> ENVELOPE_FRACTION_BITS
    }

    /// Level including the fraction bits.
    #[inline]
    pub fn fine_level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn is_off(&self) -> bool {
        self.stage == Stage::Off
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
