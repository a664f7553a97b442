//! The synthesis engine.
//!
//! [`Synth`] owns everything the render loop touches: tables, the voice pool,
//! the active patch and the render side of the queues. It can be driven
//! directly from one thread, or moved to the audio thread while
//! [`Controller`]s play it from elsewhere.

use std::sync::Arc;

use crate::config::{Config, SAMPLE_RATE};
use crate::control::{Channels, Command, Controller, Rejected};
use crate::error::{ConfigError, Error, Result};
use crate::fm::patch::VoiceParams;
use crate::fm::voice::Voice;
use crate::resources::Tables;
use crate::sample_to_f32;
use crate::visualization::{VisualizationReader, Visualizer};
use crate::voice_pool::VoicePool;

/// Returned by the render callbacks. The engine never stops by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Continue,
}

#[derive(Debug)]
pub struct Synth {
    config: Config,
    tables: Arc<Tables>,
    pool: VoicePool,
    patch: VoiceParams,

    channels: Channels,
    visualizer: Visualizer,
    reader: VisualizationReader,
}

impl Synth {
    /// Creates an engine with tables generated for the configured sample
    /// rate.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let tables = if config.sample_rate == SAMPLE_RATE {
            Tables::builtin()?
        } else {
            Arc::new(Tables::generate(config.sample_rate)?)
        };

        Self::with_tables(config, tables)
    }

    /// Creates an engine from tables built elsewhere, e.g. loaded from hex
    /// resources. Fails if the phase table was built for a sample rate other
    /// than `config.sample_rate`.
    pub fn with_tables(config: Config, tables: Arc<Tables>) -> Result<Self> {
        config.validate()?;

        if tables.sample_rate() != config.sample_rate {
            log::error!(
                "Tables for {} Hz do not fit a {} Hz engine",
                tables.sample_rate(),
                config.sample_rate
            );
            return Err(ConfigError::InvalidSetting {
                name: "sample_rate",
                reason: "does not match the phase table",
            }
            .into());
        }

        let (visualizer, reader) = Visualizer::new(config.visualization_window());

        log::info!(
            "Synth ready: {} voices at {} Hz",
            config.num_voices,
            config.sample_rate
        );

        Ok(Self {
            config,
            tables,
            pool: VoicePool::new(config.num_voices),
            patch: VoiceParams::default(),

            channels: Channels::new(config.command_capacity),
            visualizer,
            reader,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn tables(&self) -> &Arc<Tables> {
        &self.tables
    }

    /// The patch that the next note will use.
    #[inline]
    pub fn patch(&self) -> &VoiceParams {
        &self.patch
    }

    /// Replaces the patch. Notes already sounding keep the patch they were
    /// started with.
    pub fn set_patch(&mut self, patch: VoiceParams) -> Result<()> {
        patch.validate()?;

        log::info!("Selected patch '{}'", patch.name_str());

        self.patch = patch;

        Ok(())
    }

    /// Starts a note immediately and returns its voice slot.
    pub fn assign_key(&mut self, note: u8, velocity: u8) -> Result<usize> {
        let result = self.pool.assign(&self.tables, &self.patch, note, velocity);

        match &result {
            Ok(index) => log::debug!("Note on {note} (velocity {velocity}) on voice {index}"),
            Err(Error::Capacity { .. }) => log::warn!("No voice available, dropped note {note}"),
            Err(_) => {}
        }

        result
    }

    /// Releases a note immediately. Returns the slot that was released.
    pub fn release_key(&mut self, note: u8, velocity: u8) -> Result<Option<usize>> {
        log::debug!("Note off {note}");

        self.pool.release(note, velocity)
    }

    /// Releases every held note.
    pub fn all_notes_off(&mut self) -> usize {
        self.pool.release_all()
    }

    /// Frees voices whose envelopes have finished. Also runs at the start of
    /// every rendered block.
    pub fn update(&mut self) -> usize {
        self.pool.update()
    }

    #[inline]
    pub fn voices(&self) -> &[Voice] {
        self.pool.voices()
    }

    #[inline]
    pub fn lowest_held_note(&self) -> Option<u8> {
        self.pool.lowest_held_note()
    }

    /// A handle for playing the engine from another thread.
    pub fn controller(&self) -> Controller {
        Controller::new(self.channels.clone())
    }

    /// A handle for consuming visualization batches.
    pub fn visualization(&self) -> VisualizationReader {
        self.reader.clone()
    }

    /// Fills `out` with interleaved frames of `config.output_channels`
    /// channels. Never allocates, blocks or fails.
    pub fn render(&mut self, out: &mut [i32]) -> RenderStatus {
        self.render_with(out, |sample| sample)
    }

    /// Same as [`Synth::render`], converted to floats.
    pub fn render_f32(&mut self, out: &mut [f32]) -> RenderStatus {
        self.render_with(out, sample_to_f32)
    }

    #[inline]
    fn render_with<T: Copy>(&mut self, out: &mut [T], convert: impl Fn(i32) -> T) -> RenderStatus {
        self.process_commands();
        self.pool.update();

        // Held notes only change between blocks.
        let lowest_note = self.pool.lowest_held_note();
        let shift = self.config.output_shift;

        for frame in out.chunks_mut(self.config.output_channels) {
            let mix = self.pool.render(&self.tables);

            self.visualizer.push(saturate(mix), lowest_note);

            frame.fill(convert(saturate(mix << shift)));
        }

        RenderStatus::Continue
    }

    fn process_commands(&mut self) {
        while let Some(command) = self.channels.commands.pop() {
            match command {
                Command::NoteOn { note, velocity } => {
                    if self
                        .pool
                        .assign(&self.tables, &self.patch, note, velocity)
                        .is_err()
                    {
                        let _ = self
                            .channels
                            .rejections
                            .force_push(Rejected::Capacity { note, velocity });
                    }
                }
                Command::NoteOff { note, velocity } => {
                    let _ = self.pool.release(note, velocity);
                }
                Command::SetPatch(patch) => self.patch = patch,
                Command::AllNotesOff => {
                    self.pool.release_all();
                }
            }
        }
    }
}

#[inline]
fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN.into(), i32::MAX.into()) as i32
}
