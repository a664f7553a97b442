//! Polyphonic voice allocation.
//!
//! The pool is allocated once. Notes go to a free slot first; when every slot
//! is busy, the voice released the longest time ago is stolen. Held voices are
//! never stolen.

use crate::error::{check_range, Error, Result};
use crate::fm::patch::VoiceParams;
use crate::fm::voice::Voice;
use crate::resources::Tables;

#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    releases: u64,
}

impl VoicePool {
    pub fn new(num_voices: usize) -> Self {
        Self {
            voices: vec![Voice::new(); num_voices],
            releases: 0,
        }
    }

    /// Starts a note and returns the slot it was assigned to.
    ///
    /// A note that already has an enabled voice, held or releasing, keeps that
    /// voice and nothing changes.
    pub fn assign(
        &mut self,
        tables: &Tables,
        patch: &VoiceParams,
        note: u8,
        velocity: u8,
    ) -> Result<usize> {
        check_range("note", note, 127)?;
        check_range("velocity", velocity, 127)?;

        if let Some(index) = self.sounding(note) {
            return Ok(index);
        }

        let index = self
            .voices
            .iter()
            .position(|voice| !voice.is_enabled())
            .or_else(|| self.oldest_release())
            .ok_or(Error::Capacity { note })?;

        self.voices[index].start(tables, patch, note, velocity);

        Ok(index)
    }

    /// Releases the voice holding `note`. Returns its slot, or `None` if the
    /// note was not held.
    pub fn release(&mut self, note: u8, velocity: u8) -> Result<Option<usize>> {
        check_range("note", note, 127)?;
        check_range("velocity", velocity, 127)?;

        let index = self.held(note);
        if let Some(index) = index {
            self.releases += 1;
            self.voices[index].release(self.releases);
        }

        Ok(index)
    }

    /// Releases every held voice and returns how many there were.
    pub fn release_all(&mut self) -> usize {
        let mut count = 0;

        for voice in self.voices.iter_mut().filter(|voice| voice.is_gated()) {
            self.releases += 1;
            voice.release(self.releases);
            count += 1;
        }

        count
    }

    /// Frees every voice whose envelopes have all finished. Returns the
    /// number of slots returned to the pool.
    pub fn update(&mut self) -> usize {
        let mut count = 0;

        for voice in self.voices.iter_mut() {
            if voice.is_enabled() && voice.is_finished() {
                voice.disable();
                count += 1;
            }
        }

        count
    }

    /// Renders one frame of every enabled voice.
    #[inline]
    pub fn render(&mut self, tables: &Tables) -> i64 {
        self.voices
            .iter_mut()
            .filter(|voice| voice.is_enabled())
            .map(|voice| i64::from(voice.render(tables)))
            .sum()
    }

    /// The lowest note whose key is held.
    pub fn lowest_held_note(&self) -> Option<u8> {
        self.voices
            .iter()
            .filter(|voice| voice.is_gated())
            .map(Voice::note)
            .min()
    }

    #[inline]
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    fn sounding(&self, note: u8) -> Option<usize> {
        self.voices
            .iter()
            .position(|voice| voice.is_enabled() && voice.note() == note)
    }

    fn held(&self, note: u8) -> Option<usize> {
        self.voices
            .iter()
            .position(|voice| voice.is_gated() && voice.note() == note)
    }

    fn oldest_release(&self) -> Option<usize> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, voice)| voice.is_releasing())
            .min_by_key(|(_, voice)| voice.released_at())
            .map(|(index, _)| index)
    }
}
