use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use basedrop::{Owned, Shared};
use crossbeam_queue::ArrayQueue;
use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    config::{EngineConfig, PlaybackMode},
    error::Error,
    sample::SampleBuffer,
    source::{Source, SourceTime},
    utils::buffer::clear_buffer,
};

// -------------------------------------------------------------------------------------------------

pub(crate) mod voice;
pub mod wavetable;
pub mod window;

use voice::GrainVoice;
use wavetable::WavetableOscillator;

// -------------------------------------------------------------------------------------------------

/// Capacity of the engine's control message queue.
const MESSAGE_QUEUE_SIZE: usize = 32;

// -------------------------------------------------------------------------------------------------

/// Control messages consumed by the engine at the start of each rendered block.
///
/// Messages are produced in non-real-time contexts (the file loader, UI threads) and
/// popped from a lock-free queue on the render thread. Payloads which own heap memory
/// cross over as basedrop [`Shared`]/[`Owned`] values, so replacing them on the render
/// thread defers the actual deallocation to the loader's collector.
pub enum EngineMessage {
    /// Replace the engine's sample buffer and oscillator bank with a newly loaded one.
    ///
    /// `generation` is the load's monotonically increasing sequence number. The engine
    /// commits strictly increasing generations only, so a slow decode whose message
    /// arrives after a newer load's can never roll the engine back to stale material.
    SetSource {
        generation: u64,
        sample: Shared<SampleBuffer>,
        oscillators: Owned<Vec<WavetableOscillator>>,
    },
    /// Switch between granular and wavetable playback.
    SetMode(PlaybackMode),
}

// -------------------------------------------------------------------------------------------------

/// Out-of-band render diagnostics.
///
/// The render path never logs or propagates errors within its deadline; instead it
/// counts notable conditions here, to be sampled from a non-real-time thread.
#[derive(Debug, Default)]
pub struct EngineDiagnostics {
    rendered_blocks: AtomicU64,
    silent_blocks: AtomicU64,
}

impl EngineDiagnostics {
    /// Number of blocks rendered with voice or oscillator output.
    pub fn rendered_blocks(&self) -> u64 {
        self.rendered_blocks.load(Ordering::Relaxed)
    }
    /// Number of blocks which degraded to silence: no source loaded yet, a source too
    /// short to fill a grain from, or an empty oscillator bank in wavetable mode.
    pub fn silent_blocks(&self) -> u64 {
        self.silent_blocks.load(Ordering::Relaxed)
    }
}

// -------------------------------------------------------------------------------------------------

/// Clonable control handle of a [`GranularEngine`], valid after the engine moved into an
/// audio output thread.
#[derive(Clone)]
pub struct EngineHandle {
    message_queue: Arc<ArrayQueue<EngineMessage>>,
    diagnostics: Arc<EngineDiagnostics>,
}

impl EngineHandle {
    /// Switch the engine's playback mode.
    pub fn set_mode(&self, mode: PlaybackMode) -> Result<(), Error> {
        self.message_queue
            .push(EngineMessage::SetMode(mode))
            .map_err(|_| Error::SendError("engine message queue is full".to_string()))
    }

    /// Push a raw control message to the engine.
    pub fn send_message(&self, message: EngineMessage) -> Result<(), Error> {
        self.message_queue
            .push(message)
            .map_err(|_| Error::SendError("engine message queue is full".to_string()))
    }

    /// Access to the engine's render diagnostics.
    pub fn diagnostics(&self) -> &EngineDiagnostics {
        &self.diagnostics
    }
}

// -------------------------------------------------------------------------------------------------

/// A granular/wavetable playback engine: an ensemble of grain voices with staggered
/// cursors (or a bank of wavetable oscillators), summed into interleaved output blocks.
///
/// The engine is a [`Source`] and is driven entirely from the audio output's render
/// callback. Everything it needs while rendering is allocated at construction or load
/// time: the render path itself only copies, sums and pops lock-free messages.
///
/// Until a sample buffer has been loaded (see [`FileLoader`](crate::FileLoader)) the
/// engine renders silence. Loading happens in a non-real-time context and publishes
/// immutable buffer snapshots through the engine's message queue, so the render thread
/// can never observe a buffer mid-mutation.
pub struct GranularEngine {
    config: EngineConfig,
    sample_rate: u32,
    mode: PlaybackMode,
    voices: Vec<GrainVoice>,
    oscillators: Option<Owned<Vec<WavetableOscillator>>>,
    sample: Option<Shared<SampleBuffer>>,
    source_generation: u64,
    message_queue: Arc<ArrayQueue<EngineMessage>>,
    diagnostics: Arc<EngineDiagnostics>,
}

impl GranularEngine {
    /// Create a new engine with the given configuration for the given output sample
    /// rate. Allocates all grain voice tables up front.
    pub fn new(config: EngineConfig, sample_rate: u32) -> Result<Self, Error> {
        config.validate()?;

        // stagger voice cursors across the grain so grain boundaries desynchronize
        let cursor_offset = config.grain_length / config.voice_count;
        let voices = (0..config.voice_count)
            .map(|index| {
                let rng = match config.rng_seed {
                    Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(index as u64)),
                    None => SmallRng::from_os_rng(),
                };
                GrainVoice::new(config.grain_length, cursor_offset * index, rng)
            })
            .collect();

        let mode = config.playback_mode;
        Ok(Self {
            config,
            sample_rate,
            mode,
            voices,
            oscillators: None,
            sample: None,
            source_generation: 0,
            message_queue: Arc::new(ArrayQueue::new(MESSAGE_QUEUE_SIZE)),
            diagnostics: Arc::new(EngineDiagnostics::default()),
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a new control handle for the engine.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            message_queue: Arc::clone(&self.message_queue),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }

    /// Apply a newly published sample buffer and oscillator bank.
    ///
    /// Every voice copies a first grain from the new buffer right away (keeping its
    /// cursor stagger), so the next rendered block already plays the new material.
    /// The replaced `Shared`/`Owned` values deallocate via the loader's collector.
    fn commit_source(
        &mut self,
        generation: u64,
        sample: Shared<SampleBuffer>,
        oscillators: Owned<Vec<WavetableOscillator>>,
    ) {
        if self.voices.iter().all(|v| v.can_fill_from(&sample)) {
            for voice in &mut self.voices {
                voice.fill(&sample);
            }
        }
        self.sample = Some(sample);
        self.oscillators = Some(oscillators);
        self.source_generation = generation;
    }

    /// true when the current sample buffer can be rendered in the current mode.
    fn is_ready(&self) -> bool {
        let Some(sample) = &self.sample else {
            return false;
        };
        match self.mode {
            PlaybackMode::Granular => self.voices.iter().all(|v| v.can_fill_from(sample)),
            PlaybackMode::Wavetable => self
                .oscillators
                .as_ref()
                .is_some_and(|bank| !bank.is_empty() && bank.iter().all(|o| o.table_len() > 0)),
        }
    }
}

impl Source for GranularEngine {
    fn write(&mut self, output: &mut [f32], _time: &SourceTime) -> usize {
        // Drain pending control messages. Multiple queued loads collapse into the one
        // with the highest generation. Queue order doesn't decide the winner: a slow
        // decode may push its message after a newer load's, so stale sources are
        // filtered by generation both here and against the last committed one.
        let mut new_source = None;
        while let Some(msg) = self.message_queue.pop() {
            match msg {
                EngineMessage::SetSource {
                    generation,
                    sample,
                    oscillators,
                } => {
                    let newer = match &new_source {
                        Some((candidate, _, _)) => generation > *candidate,
                        None => true,
                    };
                    if newer {
                        new_source = Some((generation, sample, oscillators));
                    }
                }
                EngineMessage::SetMode(mode) => self.mode = mode,
            }
        }
        if let Some((generation, sample, oscillators)) = new_source {
            if generation > self.source_generation {
                self.commit_source(generation, sample, oscillators);
            }
        }

        // Not ready is not an error: degrade to silence and count it.
        clear_buffer(output);
        if !self.is_ready() {
            self.diagnostics.silent_blocks.fetch_add(1, Ordering::Relaxed);
            return output.len();
        }

        let channel_count = self.config.channel_count;
        match self.mode {
            PlaybackMode::Granular => {
                // voices only add into the block, so their order doesn't matter for
                // correctness; keep it fixed regardless
                if let Some(sample) = &self.sample {
                    for voice in &mut self.voices {
                        voice.process(output, channel_count, sample);
                    }
                }
            }
            PlaybackMode::Wavetable => {
                if let Some(bank) = &mut self.oscillators {
                    for frame in output.chunks_exact_mut(channel_count) {
                        let mut value = 0.0;
                        for oscillator in bank.iter_mut() {
                            value += oscillator.next_sample();
                        }
                        for sample in frame.iter_mut() {
                            *sample += value;
                        }
                    }
                }
            }
        }

        self.diagnostics
            .rendered_blocks
            .fetch_add(1, Ordering::Relaxed);
        output.len()
    }

    fn channel_count(&self) -> usize {
        self.config.channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_exhausted(&self) -> bool {
        false
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use basedrop::Collector;

    use super::*;
    use crate::engine::window::hann;

    fn test_engine(config: EngineConfig) -> GranularEngine {
        GranularEngine::new(config, 44100).unwrap()
    }

    fn publish(
        engine: &GranularEngine,
        collector: &Collector,
        generation: u64,
        channels: Vec<Vec<f32>>,
        frequencies: &[f32],
    ) {
        let sample = Shared::new(
            &collector.handle(),
            SampleBuffer::new(channels, 44100).unwrap(),
        );
        let mut bank = Vec::new();
        if !frequencies.is_empty() {
            let table = Arc::new(sample.channel(0).to_vec());
            for hz in frequencies {
                let mut oscillator = WavetableOscillator::new(Arc::clone(&table));
                oscillator.set_frequency(*hz, 44100);
                bank.push(oscillator);
            }
        }
        let oscillators = Owned::new(&collector.handle(), bank);
        engine
            .handle()
            .send_message(EngineMessage::SetSource {
                generation,
                sample,
                oscillators,
            })
            .unwrap();
    }

    #[test]
    fn silence_before_load() {
        let mut engine = test_engine(EngineConfig::default().rng_seed(5));
        let mut output = vec![1.0; 512];
        let written = engine.write(&mut output, &SourceTime::default());
        assert_eq!(written, output.len());
        assert!(output.iter().all(|s| *s == 0.0));
        assert_eq!(engine.handle().diagnostics().silent_blocks(), 1);
        assert_eq!(engine.handle().diagnostics().rendered_blocks(), 0);
    }

    #[test]
    fn end_to_end_single_voice() {
        // 5 frame source with a 4 frame grain: the only valid grain offset is 0, so the
        // first grain plays the windowed source ramp and the refill at the grain
        // boundary deterministically copies the same slice again
        let collector = Collector::new();
        let mut engine = test_engine(
            EngineConfig::default()
                .grain_length(4)
                .voice_count(1)
                .channel_count(1)
                .rng_seed(42),
        );

        // before any load: all zeros
        let mut output = vec![0.9; 4];
        engine.write(&mut output, &SourceTime::default());
        assert_eq!(output, vec![0.0; 4]);

        publish(
            &engine,
            &collector,
            1,
            vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]],
            &[],
        );

        let mut output = vec![0.0; 6];
        engine.write(&mut output, &SourceTime::default());
        for i in 0..4 {
            let expected = i as f32 * hann(i, 4);
            assert!((output[i] - expected).abs() < 1e-6, "sample {i}");
        }
        // 5th sample reads the grain boundary frame, then the refill restarts the grain
        assert!((output[4] - 4.0 * hann(4, 4)).abs() < 1e-6);
        assert!((output[5] - 0.0 * hann(0, 4)).abs() < 1e-6);
        assert_eq!(engine.handle().diagnostics().rendered_blocks(), 1);
    }

    #[test]
    fn mixing_is_linear() {
        // one engine with N seeded voices must equal the sum of N single-voice engines
        // with the same derived seeds
        let collector = Collector::new();
        let source: Vec<f32> = (0..512).map(|i| ((i * 13) % 97) as f32 / 97.0).collect();

        let config = EngineConfig::default()
            .grain_length(32)
            .voice_count(3)
            .channel_count(2)
            .rng_seed(1000);
        let mut ensemble = test_engine(config);
        publish(&ensemble, &collector, 1, vec![source.clone()], &[]);
        let mut mixed = vec![0.0; 2 * 256];
        ensemble.write(&mut mixed, &SourceTime::default());

        let mut summed = vec![0.0; 2 * 256];
        for index in 0..3u64 {
            // single voice with the same seed and cursor stagger as ensemble voice #index
            let mut engine = GranularEngine::new(
                EngineConfig::default()
                    .grain_length(32)
                    .voice_count(1)
                    .channel_count(2)
                    .rng_seed(1000 + index),
                44100,
            )
            .unwrap();
            engine.voices[0] = GrainVoice::new(
                32,
                (32 / 3) * index as usize,
                rand::rngs::SmallRng::seed_from_u64(1000 + index),
            );
            publish(&engine, &collector, 1, vec![source.clone()], &[]);
            let mut output = vec![0.0; 2 * 256];
            engine.write(&mut output, &SourceTime::default());
            for (s, o) in summed.iter_mut().zip(&output) {
                *s += *o;
            }
        }

        for (m, s) in mixed.iter().zip(&summed) {
            assert!((m - s).abs() < 1e-5);
        }
    }

    #[test]
    fn short_source_degrades_to_silence() {
        let collector = Collector::new();
        let mut engine = test_engine(
            EngineConfig::default()
                .grain_length(64)
                .voice_count(2)
                .channel_count(1)
                .rng_seed(7),
        );
        // 64 frames is one short of the 64+1 a grain copy needs
        publish(&engine, &collector, 1, vec![vec![0.5; 64]], &[]);

        let mut output = vec![1.0; 128];
        engine.write(&mut output, &SourceTime::default());
        assert!(output.iter().all(|s| *s == 0.0));
        assert_eq!(engine.handle().diagnostics().silent_blocks(), 1);
    }

    #[test]
    fn newest_queued_source_wins() {
        let collector = Collector::new();
        let mut engine = test_engine(
            EngineConfig::default()
                .grain_length(4)
                .voice_count(1)
                .channel_count(1)
                .rng_seed(9),
        );
        // two loads queued before the next block: only the second may become audible
        publish(&engine, &collector, 1, vec![vec![9.0; 32]], &[]);
        publish(&engine, &collector, 2, vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]], &[]);

        let mut output = vec![0.0; 4];
        engine.write(&mut output, &SourceTime::default());
        for i in 0..4 {
            let expected = i as f32 * hann(i, 4);
            assert!((output[i] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn late_stale_load_is_never_committed() {
        // a slow decode's message can reach the queue after a newer load's: neither
        // within one drain nor across later blocks may the older generation win
        let collector = Collector::new();
        let mut engine = test_engine(
            EngineConfig::default()
                .grain_length(4)
                .voice_count(1)
                .channel_count(1)
                .rng_seed(9),
        );
        let newer = vec![0.0, 1.0, 2.0, 3.0, 4.0];

        // out-of-order arrival within a single drain
        publish(&engine, &collector, 2, vec![newer.clone()], &[]);
        publish(&engine, &collector, 1, vec![vec![9.0; 32]], &[]);
        let mut output = vec![0.0; 4];
        engine.write(&mut output, &SourceTime::default());
        for i in 0..4 {
            let expected = i as f32 * hann(i, 4);
            assert!((output[i] - expected).abs() < 1e-6, "sample {i}");
        }

        // stale arrival in a later block, after the newer load already committed
        publish(&engine, &collector, 1, vec![vec![9.0; 32]], &[]);
        let mut output = vec![0.0; 4];
        engine.write(&mut output, &SourceTime::default());
        assert!(
            output.iter().all(|s| s.abs() < 5.0),
            "stale source material became audible"
        );
    }

    #[test]
    fn wavetable_mode() {
        let collector = Collector::new();
        let mut engine = test_engine(
            EngineConfig::default()
                .grain_length(4)
                .voice_count(1)
                .channel_count(2)
                .playback_mode(PlaybackMode::Wavetable)
                .rng_seed(3),
        );

        // wavetable mode without a bank stays silent
        publish(&engine, &collector, 1, vec![vec![0.0, 1.0, 0.0, -1.0, 0.0]], &[]);
        let mut output = vec![1.0; 8];
        engine.write(&mut output, &SourceTime::default());
        assert!(output.iter().all(|s| *s == 0.0));

        // a bank stepping one table entry per sample reproduces the table
        publish(
            &engine,
            &collector,
            2,
            vec![vec![0.0, 1.0, 0.0, -1.0, 0.0]],
            &[44100.0 / 5.0],
        );
        let mut output = vec![0.0; 8];
        engine.write(&mut output, &SourceTime::default());
        let expected = [0.0, 1.0, 0.0, -1.0];
        for (frame, value) in output.chunks_exact(2).zip(expected) {
            assert!((frame[0] - value).abs() < 1e-6);
            assert_eq!(frame[0], frame[1]);
        }

        // switching modes at runtime reuses the loaded buffer for grains
        engine.handle().set_mode(PlaybackMode::Granular).unwrap();
        let mut output = vec![0.0; 8];
        engine.write(&mut output, &SourceTime::default());
        assert_eq!(engine.handle().diagnostics().rendered_blocks(), 2);
    }
}
