//! Engine configuration.

use crate::error::ConfigError;

/// Default audio sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44100;

/// Nominal number of frames the audio driver requests per callback.
pub const BLOCK_SIZE: usize = 64;

/// Default number of polyphonic voice slots.
pub const NUM_VOICES: usize = 16;

/// Number of visualization windows handed out per second.
pub const VISUALIZATION_RATE: u32 = 60;

/// Engine settings. All values are fixed for the lifetime of a
/// [`Synth`](crate::Synth).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Output sample rate in Hz. Determines the phase-increment table.
    pub sample_rate: u32,
    /// Size of the voice pool.
    pub num_voices: usize,
    /// Number of interleaved output channels. The mono mix is duplicated.
    pub output_channels: usize,
    /// Left shift applied to the master bus before it is written out.
    pub output_shift: u32,
    /// Capacity of the control-to-render command queue.
    pub command_capacity: usize,
    /// Visualization windows per second.
    pub visualization_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            num_voices: NUM_VOICES,
            output_channels: 2,
            output_shift: 1,
            command_capacity: 256,
            visualization_rate: VISUALIZATION_RATE,
        }
    }
}

impl Config {
    /// Checks that every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The phase table holds 2^41 / sample_rate, which must fit 32 bits.
        if self.sample_rate < 1024 {
            return Err(ConfigError::InvalidSetting {
                name: "sample_rate",
                reason: "must be at least 1024 Hz",
            });
        }
        if self.num_voices == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "num_voices",
                reason: "must be at least 1",
            });
        }
        if self.output_channels == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "output_channels",
                reason: "must be at least 1",
            });
        }
        if self.output_shift > 8 {
            return Err(ConfigError::InvalidSetting {
                name: "output_shift",
                reason: "must be 8 or less",
            });
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "command_capacity",
                reason: "must be at least 1",
            });
        }
        if self.visualization_rate == 0 || self.visualization_rate > self.sample_rate {
            return Err(ConfigError::InvalidSetting {
                name: "visualization_rate",
                reason: "must be between 1 and the sample rate",
            });
        }

        Ok(())
    }

    /// Number of frames in one visualization window.
    #[inline]
    pub fn visualization_window(&self) -> usize {
        (self.sample_rate / self.visualization_rate) as usize
    }
}
