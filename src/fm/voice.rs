//! DX7 voice.
//!
//! A voice owns six operators and evaluates them once per frame following
//! the algorithm latched at note-on. Operators run from 6 down to 1, so the
//! output of a modulator is always complete before its carriers read it.
//! The feedback register closes the only cycle, one frame late.

use super::algorithms::Algorithm;
use super::dx_units::{feedback_modulation, transpose};
use super::operator::Operator;
use super::patch::VoiceParams;
use super::NUM_OPERATORS;
use crate::resources::Tables;

#[derive(Debug, Clone)]
pub struct Voice {
    enabled: bool,
    gate: bool,
    note: u8,
    velocity: u8,
    released_at: u64,

    algorithm: Algorithm,
    feedback_amount: u8,
    feedback: i32,

    operators: [Operator; NUM_OPERATORS],
}

impl Voice {
    pub fn new() -> Self {
        Self {
            enabled: false,
            gate: false,
            note: 0,
            velocity: 0,
            released_at: 0,

            algorithm: Algorithm::default(),
            feedback_amount: 0,
            feedback: 0,

            operators: [Operator::new(); NUM_OPERATORS],
        }
    }

    /// Assigns a note. Every parameter of `patch` that shapes the sound is
    /// latched here; later patch changes do not affect this note.
    pub fn start(&mut self, tables: &Tables, patch: &VoiceParams, note: u8, velocity: u8) {
        let played = transpose(note, patch.transpose);

        for (op, params) in self.operators.iter_mut().zip(patch.operators.iter()) {
            op.start(tables, params, played, velocity);
        }

        self.algorithm = *tables.algorithm(patch.algorithm);
        self.feedback_amount = patch.feedback;
        self.feedback = 0;

        self.note = note;
        self.velocity = velocity;
        self.enabled = true;
        self.gate = true;
    }

    /// Releases the key. The voice keeps sounding until every envelope is
    /// off. `order` ranks releases for voice stealing.
    #[inline]
    pub fn release(&mut self, order: u64) {
        if self.gate {
            self.gate = false;
            self.released_at = order;
        }
    }

    /// Returns the slot to the free pool.
    #[inline]
    pub fn disable(&mut self) {
        self.enabled = false;
        self.gate = false;
    }

    /// Renders one frame and returns the sum of the carriers.
    #[inline]
    pub fn render(&mut self, tables: &Tables) -> i32 {
        for op in self.operators.iter_mut() {
            op.modulation = 0;
        }

        let feedback = self.algorithm.feedback();
        if let Some(path) = feedback {
            self.operators[path.destination].modulation =
                feedback_modulation(self.feedback, self.feedback_amount);
        }

        let mut out = 0i32;

        for i in (0..NUM_OPERATORS).rev() {
            let sample = self.operators[i].render(tables, self.gate);
            let route = *self.algorithm.route(i);

            if route.to_master {
                out = out.wrapping_add(sample);
            }

            if feedback.is_some_and(|path| path.source == i) {
                self.feedback = sample;
            }

            let mut targets = route.modulates;
            while targets != 0 {
                let target = targets.trailing_zeros() as usize;
                let op = &mut self.operators[target];
                op.modulation = op.modulation.wrapping_add(sample);
                targets &= targets - 1;
            }
        }

        out
    }

    /// True once every operator envelope is off.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.operators.iter().all(|op| op.envelope.is_off())
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_gated(&self) -> bool {
        self.gate
    }

    /// True while the key is up but the envelopes still run.
    #[inline]
    pub fn is_releasing(&self) -> bool {
        self.enabled && !self.gate
    }

    #[inline]
    pub fn note(&self) -> u8 {
        self.note
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    #[inline]
    pub fn released_at(&self) -> u64 {
        self.released_at
    }

    #[inline]
    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Last output of the feedback source.
    #[inline]
    pub fn feedback(&self) -> i32 {
        self.feedback
    }

    #[inline]
    pub fn operators(&self) -> &[Operator; NUM_OPERATORS] {
        &self.operators
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}
