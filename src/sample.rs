use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// An immutable, fully decoded recording which grain voices copy their grains from.
///
/// Sample buffers hold planar (per channel) f32 data and are never mutated after
/// construction: a new file load builds a new buffer and publishes it to the render
/// context as a whole, replacing the previous one. This makes sharing a buffer into
/// the real-time render path a plain read-only borrow with no torn reads possible.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    frame_count: usize,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a new sample buffer from the given planar channel data.
    ///
    /// All channels must have the same length. An empty channel list or empty
    /// channels are allowed and result in a buffer which the engine treats as
    /// "not ready".
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, Error> {
        let frame_count = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|c| c.len() != frame_count) {
            return Err(Error::ParameterError(
                "All sample buffer channels must have the same length".to_string(),
            ));
        }
        Ok(Self {
            channels,
            frame_count,
            sample_rate,
        })
    }

    /// Create a new buffer without any content.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of frames in each channel.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate of the decoded recording.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Read-only access to a single channel's samples.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// true when the buffer holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0 || self.channels.is_empty()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction() {
        let buffer = SampleBuffer::new(vec![vec![0.0; 8], vec![0.0; 8]], 44100).unwrap();
        assert_eq!(buffer.frame_count(), 8);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 44100);
        assert!(!buffer.is_empty());

        let empty = SampleBuffer::empty();
        assert_eq!(empty.frame_count(), 0);
        assert_eq!(empty.channel_count(), 0);
        assert!(empty.is_empty());

        // zero frames is well defined, not an error
        let zero_frames = SampleBuffer::new(vec![vec![], vec![]], 44100).unwrap();
        assert!(zero_frames.is_empty());

        // mismatched channel lengths are rejected
        assert!(SampleBuffer::new(vec![vec![0.0; 4], vec![0.0; 5]], 44100).is_err());
    }
}
