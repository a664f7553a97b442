//! Hand-off of rendered frames to a display.
//!
//! The render context appends every master sample to a window of fixed
//! length. A full window becomes the pending batch unless the previous one was
//! not consumed yet, in which case it is dropped. Three buffers circulate
//! between the two sides, so neither side ever allocates or blocks after
//! construction.

use std::fmt;
use std::mem;
use std::ops::Deref;
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

const SPARE_BUFFERS: usize = 2;

#[derive(Debug)]
struct Window {
    samples: Vec<i32>,
    lowest_note: Option<u8>,
}

#[derive(Debug)]
struct Shared {
    pending: ArrayQueue<Window>,
    spare: ArrayQueue<Vec<i32>>,
}

/// Render side of the hand-off.
#[derive(Debug)]
pub struct Visualizer {
    shared: Arc<Shared>,
    current: Vec<i32>,
    window: usize,
    dropped: u64,
}

impl Visualizer {
    /// Creates the render side and the matching reader.
    pub fn new(window: usize) -> (Self, VisualizationReader) {
        let window = window.max(1);

        let shared = Arc::new(Shared {
            pending: ArrayQueue::new(1),
            spare: ArrayQueue::new(SPARE_BUFFERS),
        });
        for _ in 0..SPARE_BUFFERS {
            let _ = shared.spare.push(Vec::with_capacity(window));
        }

        let visualizer = Self {
            shared: Arc::clone(&shared),
            current: Vec::with_capacity(window),
            window,
            dropped: 0,
        };

        (visualizer, VisualizationReader { shared })
    }

    /// Appends one frame.
    #[inline]
    pub fn push(&mut self, sample: i32, lowest_note: Option<u8>) {
        self.current.push(sample);

        if self.current.len() >= self.window {
            self.publish(lowest_note);
        }
    }

    fn publish(&mut self, lowest_note: Option<u8>) {
        if self.shared.pending.is_full() {
            self.dropped += 1;
            self.current.clear();
            return;
        }

        let Some(next) = self.shared.spare.pop() else {
            self.dropped += 1;
            self.current.clear();
            return;
        };

        let window = Window {
            samples: mem::replace(&mut self.current, next),
            lowest_note,
        };

        // Only this side pushes, so the slot checked above is still free.
        if let Err(window) = self.shared.pending.push(window) {
            self.dropped += 1;
            let mut samples = window.samples;
            samples.clear();
            let _ = self.shared.spare.push(samples);
        }
    }

    /// Frames per window.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Windows dropped because the reader was behind.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Consumer side of the hand-off.
#[derive(Debug, Clone)]
pub struct VisualizationReader {
    shared: Arc<Shared>,
}

impl VisualizationReader {
    /// Takes the pending batch, if there is one. Never blocks.
    pub fn consume(&self) -> Option<Batch> {
        let window = self.shared.pending.pop()?;

        Some(Batch {
            samples: window.samples,
            lowest_note: window.lowest_note,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// One window of master samples. The buffer goes back to the render side
/// when the batch is dropped.
pub struct Batch {
    samples: Vec<i32>,
    lowest_note: Option<u8>,
    shared: Arc<Shared>,
}

impl Batch {
    /// Lowest held note when the window was completed, for display scaling.
    #[inline]
    pub fn lowest_note(&self) -> Option<u8> {
        self.lowest_note
    }
}

impl Deref for Batch {
    type Target = [i32];

    fn deref(&self) -> &[i32] {
        &self.samples
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("len", &self.samples.len())
            .field("lowest_note", &self.lowest_note)
            .finish()
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        let mut samples = mem::take(&mut self.samples);
        samples.clear();
        let _ = self.shared.spare.push(samples);
    }
}
