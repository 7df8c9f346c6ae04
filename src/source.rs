use std::time::Instant;

pub mod empty;

// -------------------------------------------------------------------------------------------------

/// Playback time of a source's output, passed along in [`Source::write`] calls.
#[derive(Debug, Clone, Copy)]
pub struct SourceTime {
    /// Position of the output stream in frames since playback started.
    pub pos_in_frames: u64,
    /// Instant the stream position was last updated at.
    pub pos_instant: Instant,
}

impl SourceTime {
    pub fn new() -> Self {
        Self {
            pos_in_frames: 0,
            pos_instant: Instant::now(),
        }
    }

    /// Returns a copy of self with the given number of frames added to the stream position.
    pub fn with_added_frames(&self, frames: u64) -> Self {
        Self {
            pos_in_frames: self.pos_in_frames + frames,
            pos_instant: self.pos_instant,
        }
    }
}

impl Default for SourceTime {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

/// Types which can produce interleaved audio samples in f32 format. `Send`able across
/// threads as sources are usually created in some controller thread and then moved into
/// a real-time audio output thread.
pub trait Source: Send + 'static {
    /// Write at most `output.len()` samples into the interleaved `output` and return the
    /// number of written samples. Should take care to always write whole frames and must
    /// _never_ block or allocate: this runs on the audio output's deadline path.
    fn write(&mut self, output: &mut [f32], time: &SourceTime) -> usize;

    /// The source's output channel count.
    fn channel_count(&self) -> usize;
    /// The source's output sample rate.
    fn sample_rate(&self) -> u32;

    /// true when the source finished playback and will never produce samples again.
    fn is_exhausted(&self) -> bool;
}
