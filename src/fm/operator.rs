//! FM Operator.

use super::dx_units::{attenuation, log_frequency, output_scale, phase_increment, rate_scaling};
use super::envelope::Envelope;
use super::patch::OperatorParams;
use super::sine::sample;
use crate::resources::Tables;

#[derive(Debug, Default, Clone, Copy)]
pub struct Operator {
    /// Wraps freely; one cycle is `1 << LOG_FREQUENCY_BITS`.
    pub phase: u32,
    /// Phase modulation collected for the current frame.
    pub modulation: i32,
    pub envelope: Envelope,

    increment: u32,
    output_scale: u32,
}

impl Operator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches the parameters for a played note and restarts the operator.
    pub fn start(&mut self, tables: &Tables, params: &OperatorParams, note: u8, velocity: u8) {
        self.increment = phase_increment(tables, log_frequency(tables, note, &params.oscillator));
        self.output_scale = output_scale(tables, params, note, velocity);
        self.envelope.set(
            tables,
            &params.envelope,
            rate_scaling(note, params.rate_scaling),
        );

        self.phase = 0;
        self.modulation = 0;
        self.envelope.start();
    }

    /// Produces one sample, then advances the phase and the envelope.
    #[inline]
    pub fn render(&mut self, tables: &Tables, gate: bool) -> i32 {
        let out = if self.envelope.is_off() {
            0
        } else {
            sample(
                tables,
                self.phase.wrapping_add(self.modulation as u32),
                self.attenuation(),
            )
        };

        self.phase = self.phase.wrapping_add(self.increment);
        self.envelope.render(gate);

        out
    }

    /// Current attenuation, envelope and output level combined.
    #[inline]
    pub fn attenuation(&self) -> u32 {
        attenuation(self.envelope.level(), self.output_scale)
    }

    #[inline]
    pub fn increment(&self) -> u32 {
        self.increment
    }

    #[inline]
    pub fn output_scale(&self) -> u32 {
        self.output_scale
    }
}
