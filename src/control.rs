//! Control context.
//!
//! A [`Controller`] is the handle the control surface (MIDI input, a UI, a
//! network endpoint) uses to play the engine from another thread. Requests
//! are validated here and queued; the render context applies them at the
//! start of its next block, so a note takes effect at most one block late.
//! Notes the engine had no voice for come back through
//! [`Controller::poll_rejection`].

use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use crate::error::{check_range, Error, Result};
use crate::fm::patch::VoiceParams;

/// A request for the render context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    /// Replace the patch used by subsequently triggered notes.
    SetPatch(VoiceParams),
    AllNotesOff,
}

/// A queued command the render context could not carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// No free or releasing voice was left for the note.
    Capacity { note: u8, velocity: u8 },
}

impl From<Rejected> for Error {
    fn from(rejected: Rejected) -> Self {
        match rejected {
            Rejected::Capacity { note, .. } => Error::Capacity { note },
        }
    }
}

/// Note messages understood by [`Controller::handle_midi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
}

impl MidiMessage {
    const NOTE_OFF: u8 = 0x80;
    const NOTE_ON: u8 = 0x90;

    /// Parses a 3-byte channel voice message. A note-on with velocity 0 is a
    /// note-off.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let status = bytes.first().copied().unwrap_or_default();

        let unsupported = Error::UnsupportedMidi {
            status,
            len: bytes.len(),
        };

        let &[_, note, velocity] = bytes else {
            return Err(unsupported);
        };

        let kind = status & 0xf0;
        if kind != Self::NOTE_ON && kind != Self::NOTE_OFF {
            return Err(unsupported);
        }

        check_range("note", note, 127)?;
        check_range("velocity", velocity, 127)?;

        let channel = status & 0x0f;

        if kind == Self::NOTE_ON && velocity > 0 {
            Ok(Self::NoteOn {
                channel,
                note,
                velocity,
            })
        } else {
            Ok(Self::NoteOff {
                channel,
                note,
                velocity,
            })
        }
    }
}

/// Queue ends shared by the controllers and the render context.
#[derive(Debug, Clone)]
pub(crate) struct Channels {
    pub commands: Arc<ArrayQueue<Command>>,
    pub rejections: Arc<ArrayQueue<Rejected>>,
}

impl Channels {
    pub fn new(capacity: usize) -> Self {
        Self {
            commands: Arc::new(ArrayQueue::new(capacity)),
            rejections: Arc::new(ArrayQueue::new(capacity)),
        }
    }
}

/// Cloneable, thread-safe handle for the control context.
#[derive(Debug, Clone)]
pub struct Controller {
    channels: Channels,
}

impl Controller {
    pub(crate) fn new(channels: Channels) -> Self {
        Self { channels }
    }

    /// Queues a note-on. Out-of-range values are rejected without effect.
    pub fn assign_key(&self, note: u8, velocity: u8) -> Result<()> {
        check_range("note", note, 127)?;
        check_range("velocity", velocity, 127)?;

        log::debug!("Note on {note} (velocity {velocity})");

        self.send(Command::NoteOn { note, velocity })
    }

    /// Queues a note-off.
    pub fn release_key(&self, note: u8, velocity: u8) -> Result<()> {
        check_range("note", note, 127)?;
        check_range("velocity", velocity, 127)?;

        log::debug!("Note off {note}");

        self.send(Command::NoteOff { note, velocity })
    }

    /// Validates and queues a patch for subsequently triggered notes.
    pub fn select_patch(&self, patch: VoiceParams) -> Result<()> {
        patch.validate()?;

        log::info!("Selected patch '{}'", patch.name_str());

        self.send(Command::SetPatch(patch))
    }

    /// Queues the release of every held note.
    pub fn all_notes_off(&self) -> Result<()> {
        log::debug!("All notes off");

        self.send(Command::AllNotesOff)
    }

    /// Applies a raw 3-byte MIDI note message. The channel is ignored.
    pub fn handle_midi(&self, bytes: &[u8]) -> Result<()> {
        match MidiMessage::parse(bytes)? {
            MidiMessage::NoteOn { note, velocity, .. } => self.assign_key(note, velocity),
            MidiMessage::NoteOff { note, velocity, .. } => self.release_key(note, velocity),
        }
    }

    /// Takes the next command the render context had to drop.
    pub fn poll_rejection(&self) -> Option<Rejected> {
        let rejected = self.channels.rejections.pop()?;

        match rejected {
            Rejected::Capacity { note, .. } => {
                log::warn!("No voice available, dropped note {note}");
            }
        }

        Some(rejected)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.channels
            .commands
            .push(command)
            .map_err(|_| Error::QueueFull)
    }
}
