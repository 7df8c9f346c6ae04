use std::{path::Path, time::Duration};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{
    error::Error,
    source::{Source, SourceTime},
    utils::buffer::clear_buffer,
};

// -------------------------------------------------------------------------------------------------

const BUFFER_SIZE_FRAMES: usize = 1024;

// -------------------------------------------------------------------------------------------------

/// Audio output which renders a source into a wav file instead of playing it back.
///
/// Unlike the real-time device outputs this pulls the source as fast as possible, so
/// rendering a minute of audio takes a fraction of a second. Wav file contents are
/// always saved as 32bit floats.
pub struct WavOutput {
    writer: WavWriter<std::io::BufWriter<std::fs::File>>,
    sample_rate: u32,
    channel_count: usize,
}

impl WavOutput {
    /// Create a new wav output writing to the given file path.
    ///
    /// * `file_path`: Target file path. Should end with a ".wav" extension.
    /// * `sample_rate`: The wav file's sample rate, and the rate sources must render at.
    /// * `channel_count`: The wav file's channel layout.
    pub fn open<P: AsRef<Path>>(
        file_path: P,
        sample_rate: u32,
        channel_count: usize,
    ) -> Result<Self, Error> {
        let spec = WavSpec {
            channels: channel_count as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer =
            WavWriter::create(file_path, spec).map_err(|e| Error::OutputDeviceError(Box::new(e)))?;
        Ok(Self {
            writer,
            sample_rate,
            channel_count,
        })
    }

    /// Render the given source into the file for the given duration, then finalize the
    /// file. The source's channel layout and sample rate must match the output's.
    pub fn render(mut self, mut source: impl Source, duration: Duration) -> Result<(), Error> {
        assert_eq!(source.channel_count(), self.channel_count);
        assert_eq!(source.sample_rate(), self.sample_rate);

        let total_frames = (duration.as_secs_f64() * self.sample_rate as f64) as u64;
        let mut time = SourceTime::new();
        let mut buffer = vec![0.0_f32; BUFFER_SIZE_FRAMES * self.channel_count];

        while time.pos_in_frames < total_frames {
            let frames = (total_frames - time.pos_in_frames).min(BUFFER_SIZE_FRAMES as u64);
            let block = &mut buffer[..frames as usize * self.channel_count];
            clear_buffer(block);
            let written = source.write(block, &time);
            for sample in &block[..written] {
                self.writer
                    .write_sample(*sample)
                    .map_err(|e| Error::OutputDeviceError(Box::new(e)))?;
            }
            if written < block.len() {
                // the source stopped producing output, pad the remainder with silence
                for _ in written..block.len() {
                    self.writer
                        .write_sample(0.0_f32)
                        .map_err(|e| Error::OutputDeviceError(Box::new(e)))?;
                }
            }
            time = time.with_added_frames(frames);
        }

        self.writer
            .finalize()
            .map_err(|e| Error::OutputDeviceError(Box::new(e)))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, FileLoader, GranularEngine};

    #[test]
    fn rendered_file_holds_engine_output() {
        let mut engine = GranularEngine::new(
            EngineConfig::default()
                .grain_length(256)
                .voice_count(3)
                .channel_count(2)
                .rng_seed(21),
            44100,
        )
        .unwrap();
        let mut loader = FileLoader::new(&engine, None);
        let noise: Vec<f32> = (0..4096).map(|i| ((i * 7919) % 101) as f32 / 101.0).collect();
        loader.load_buffer(vec![noise], 44100).unwrap();

        // prime the engine so the file isn't all leading silence
        let mut warmup = vec![0.0; 64];
        use crate::source::Source;
        engine.write(&mut warmup, &SourceTime::default());

        let path = std::env::temp_dir().join("grainbox-wav-output-test.wav");
        let output = WavOutput::open(&path, 44100, 2).unwrap();
        output
            .render(engine, Duration::from_millis(100))
            .unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.duration(), 4410);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert!(samples.iter().any(|s| s.abs() > 0.01));
        std::fs::remove_file(&path).ok();
    }
}
