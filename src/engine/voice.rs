use rand::{rngs::SmallRng, Rng};

use super::window;
use crate::sample::SampleBuffer;

// -------------------------------------------------------------------------------------------------

/// A single granular playback voice.
///
/// Each voice owns a fixed-length grain table holding `grain_length + 1` frames copied
/// from a random offset of the loaded [`SampleBuffer`]. The extra trailing frame keeps
/// windowed lookups at the grain boundary in bounds. The table is allocated once at
/// construction and refilled in place, so voices never allocate while rendering.
///
/// The read cursor stays within `[0, grain_length]`; when it reaches `grain_length` the
/// table is refilled from a fresh random offset and the cursor resets to 0.
#[derive(Debug)]
pub(crate) struct GrainVoice {
    table: Vec<f32>,
    cursor: usize,
    grain_length: usize,
    rng: SmallRng,
}

impl GrainVoice {
    /// Create a new voice with the given grain length and initial cursor offset.
    ///
    /// The initial cursor staggers voices of an ensemble against each other, so their
    /// grain boundaries don't line up into one audible synchronized click.
    pub fn new(grain_length: usize, initial_cursor: usize, rng: SmallRng) -> Self {
        debug_assert!(grain_length >= 2, "Invalid grain length");
        debug_assert!(initial_cursor <= grain_length, "Invalid cursor offset");
        Self {
            table: vec![0.0; grain_length + 1],
            cursor: initial_cursor.min(grain_length),
            grain_length,
            rng,
        }
    }

    /// The voice's current read cursor, within `[0, grain_length]`.
    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// true when the given source holds enough frames to copy one grain from it.
    pub fn can_fill_from(&self, source: &SampleBuffer) -> bool {
        source.channel_count() > 0 && source.frame_count() > self.grain_length
    }

    /// Copy a fresh grain from a random source offset without disturbing the cursor.
    ///
    /// Used when a newly loaded source is committed: every voice picks up new material
    /// while the ensemble's cursor stagger stays intact.
    pub fn fill(&mut self, source: &SampleBuffer) {
        debug_assert!(self.can_fill_from(source), "Source too short for a grain");

        // valid grain start offsets are [0, frame_count - grain_length): anything past
        // that would read the grain's trailing frame out of bounds
        let start = self
            .rng
            .random_range(0..source.frame_count() - self.grain_length);
        let channel = source.channel(0);
        self.table
            .copy_from_slice(&channel[start..start + self.grain_length + 1]);
    }

    /// Refill the grain table and restart playback from the grain's beginning.
    fn refill(&mut self, source: &SampleBuffer) {
        self.fill(source);
        self.cursor = 0;
    }

    /// Render the voice into the given interleaved output block, one windowed grain
    /// sample per frame, added on top of whatever the block already holds.
    ///
    /// The mono grain content is broadcast to all output channels. The passed source
    /// must be long enough to fill a grain from (checked by the ensemble up front).
    pub fn process(&mut self, output: &mut [f32], channel_count: usize, source: &SampleBuffer) {
        for frame in output.chunks_exact_mut(channel_count) {
            let value = self.table[self.cursor] * window::hann(self.cursor, self.grain_length);
            for sample in frame.iter_mut() {
                *sample += value;
            }

            if self.cursor == self.grain_length {
                self.refill(source);
            } else {
                self.cursor += 1;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn ramp_source(frame_count: usize) -> SampleBuffer {
        let ramp = (0..frame_count).map(|i| i as f32).collect();
        SampleBuffer::new(vec![ramp], 44100).unwrap()
    }

    fn voice(grain_length: usize, initial_cursor: usize) -> GrainVoice {
        GrainVoice::new(grain_length, initial_cursor, SmallRng::seed_from_u64(1))
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let source = ramp_source(4096);
        let mut voice = voice(128, 77);
        let mut output = vec![0.0; 2 * 256];
        for _ in 0..100 {
            voice.process(&mut output, 2, &source);
            assert!(voice.cursor() <= 128);
        }
    }

    #[test]
    fn refill_offsets_stay_in_range() {
        // source barely longer than a grain: the only valid start offset is 0, so a
        // correctly clamped refill always copies the full source
        let source = ramp_source(5);
        let mut voice = voice(4, 0);
        let mut output = vec![0.0; 64];
        voice.fill(&source);
        voice.process(&mut output, 1, &source);
        assert_eq!(voice.table, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        // larger sources: run plenty of refills against a debug-checked copy range
        let source = ramp_source(1000);
        let mut voice = GrainVoice::new(100, 0, SmallRng::seed_from_u64(23));
        let mut output = vec![0.0; 512];
        for _ in 0..100 {
            voice.process(&mut output, 1, &source);
            // the table is a contiguous source slice: its first frame reveals the offset
            let start = voice.table[0] as usize;
            assert!(start + 100 < 1000);
        }
    }

    #[test]
    fn grain_is_windowed_and_broadcast() {
        let source = ramp_source(5);
        let mut voice = voice(4, 0);
        voice.fill(&source);

        let mut output = vec![0.0; 2 * 4];
        voice.process(&mut output, 2, &source);
        for i in 0..4 {
            let expected = i as f32 * window::hann(i, 4);
            assert!((output[i * 2] - expected).abs() < 1e-6);
            assert_eq!(output[i * 2], output[i * 2 + 1]);
        }
    }

    #[test]
    fn output_accumulates() {
        let source = ramp_source(64);
        let mut voice = voice(16, 0);
        voice.fill(&source);

        let mut output = vec![1.0; 32];
        let mut reference = vec![0.0; 32];
        let mut voice2 = GrainVoice::new(16, 0, SmallRng::seed_from_u64(1));
        voice2.fill(&source);

        voice.process(&mut output, 1, &source);
        voice2.process(&mut reference, 1, &source);
        for (o, r) in output.iter().zip(&reference) {
            assert!((o - (r + 1.0)).abs() < 1e-6);
        }
    }
}
