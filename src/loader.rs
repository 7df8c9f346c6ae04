use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
};

use basedrop::{Collector, Handle, Owned, Shared};
use crossbeam_channel::Sender;
use symphonia::core::audio::SampleBuffer as SymphoniaSampleBuffer;

use crate::{
    config::EngineConfig,
    engine::{wavetable::WavetableOscillator, EngineHandle, EngineMessage, GranularEngine},
    error::Error,
    sample::SampleBuffer,
    source::Source,
    utils::buffer::interleaved_to_planar,
};

// -------------------------------------------------------------------------------------------------

pub(crate) mod decoder;

use decoder::AudioDecoder;

// -------------------------------------------------------------------------------------------------

/// Status events of background file loads, emitted by [`FileLoader::load_file`].
#[derive(Debug)]
pub enum LoadStatusEvent {
    /// A file finished decoding and was handed to the engine.
    Loaded {
        path: Arc<String>,
        frame_count: usize,
        channel_count: usize,
        sample_rate: u32,
    },
    /// A file failed to decode. The engine's state is unchanged.
    Failed { path: Arc<String>, error: Error },
}

// -------------------------------------------------------------------------------------------------

/// Bridges file-selection events to the engine's sample buffer.
///
/// The loader decodes files on background threads, builds an immutable [`SampleBuffer`]
/// snapshot (and, when wavetable frequencies are configured, a fresh oscillator bank)
/// and publishes both to the engine through its lock-free message queue. The engine
/// picks the snapshot up at the start of its next rendered block.
///
/// A new load request supersedes any still-running decode: stale results are discarded
/// and never committed, so the newest requested file always wins. Failed loads leave the
/// engine's current state untouched.
///
/// Buffers replaced on the render thread are reclaimed by the loader's basedrop
/// collector; [`FileLoader::collect`] should be called now and then (each new load also
/// runs it).
pub struct FileLoader {
    engine: EngineHandle,
    config: EngineConfig,
    output_sample_rate: u32,
    collector: Collector,
    generation: Arc<AtomicU64>,
    status_send: Option<Sender<LoadStatusEvent>>,
}

impl FileLoader {
    /// Create a new loader feeding the given engine. Status events of background loads
    /// are emitted to the given optional channel.
    pub fn new(engine: &GranularEngine, status_send: Option<Sender<LoadStatusEvent>>) -> Self {
        Self {
            engine: engine.handle(),
            config: engine.config().clone(),
            output_sample_rate: engine.sample_rate(),
            collector: Collector::new(),
            generation: Arc::new(AtomicU64::new(0)),
            status_send,
        }
    }

    /// Decode the given file on a background thread and hand it to the engine.
    ///
    /// Supersedes any in-flight load. Completion or failure is reported through the
    /// loader's status channel, if one was set.
    pub fn load_file(&mut self, file_path: impl Into<String>) {
        let path = Arc::new(file_path.into());
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.collect();

        let generation = Arc::clone(&self.generation);
        let engine = self.engine.clone();
        let config = self.config.clone();
        let output_sample_rate = self.output_sample_rate;
        let collector_handle = self.collector.handle();
        let status_send = self.status_send.clone();

        thread::spawn(move || {
            let result = Self::decode_file(path.as_str());
            // A newer load request may have superseded this one while decoding. This
            // check is an early discard only: the message below carries the generation
            // token, and the engine ignores any generation older than its committed
            // one, so a stale message racing past this check stays inaudible.
            if generation.load(Ordering::SeqCst) != token {
                log::debug!("discarding superseded file load: {path}");
                return;
            }
            let status = match result {
                Ok((channels, sample_rate)) => Self::commit(
                    &engine,
                    &config,
                    output_sample_rate,
                    &collector_handle,
                    token,
                    channels,
                    sample_rate,
                )
                .map(|(frame_count, channel_count)| LoadStatusEvent::Loaded {
                    path: Arc::clone(&path),
                    frame_count,
                    channel_count,
                    sample_rate,
                }),
                Err(error) => Err(error),
            };
            let event = status.unwrap_or_else(|error| {
                log::error!("failed to load file {path}: {error}");
                LoadStatusEvent::Failed {
                    path: Arc::clone(&path),
                    error,
                }
            });
            if let Some(sender) = &status_send {
                if let Err(err) = sender.try_send(event) {
                    log::warn!("failed to send load status event: {err}");
                }
            }
        });
    }

    /// Decode the given file on the calling thread and hand it to the engine.
    pub fn load_file_blocking(&mut self, file_path: impl AsRef<str>) -> Result<(), Error> {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.collect();
        let (channels, sample_rate) = Self::decode_file(file_path.as_ref())?;
        Self::commit(
            &self.engine,
            &self.config,
            self.output_sample_rate,
            &self.collector.handle(),
            token,
            channels,
            sample_rate,
        )?;
        Ok(())
    }

    /// Hand an already decoded planar buffer to the engine. This is the boundary used
    /// when decoding happens elsewhere: anything which can produce normalized f32
    /// channel data can feed the engine through it.
    pub fn load_buffer(&mut self, channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<(), Error> {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.collect();
        Self::commit(
            &self.engine,
            &self.config,
            self.output_sample_rate,
            &self.collector.handle(),
            token,
            channels,
            sample_rate,
        )?;
        Ok(())
    }

    /// Reclaim sample buffers which the render thread dropped in the meantime.
    pub fn collect(&mut self) {
        self.collector.collect();
    }

    /// Decode an entire file into planar f32 channel data.
    fn decode_file(file_path: &str) -> Result<(Vec<Vec<f32>>, u32), Error> {
        let mut audio_decoder = AudioDecoder::from_file(file_path)?;
        let sample_rate = audio_decoder.signal_spec().rate;
        let channel_count = audio_decoder.signal_spec().channels.count();

        // prealloc the interleaved buffer when the decoder gives us a frame hint
        let buffer_capacity =
            audio_decoder.codec_params().n_frames.unwrap_or(0) as usize * channel_count;
        let mut interleaved = Vec::with_capacity(buffer_capacity);

        // decode the entire file in chunks of max_frames_per_packet sizes
        let decode_buffer_capacity = audio_decoder
            .codec_params()
            .max_frames_per_packet
            .unwrap_or(16 * 1024 * channel_count as u64);
        let mut decode_buffer =
            SymphoniaSampleBuffer::<f32>::new(decode_buffer_capacity, audio_decoder.signal_spec());
        while audio_decoder.read_packet(&mut decode_buffer).is_some() {
            interleaved.extend_from_slice(decode_buffer.samples());
        }

        if interleaved.is_empty() || channel_count == 0 {
            return Err(Error::BufferTooShort { frame_count: 0 });
        }

        let frame_count = interleaved.len() / channel_count;
        let mut channels = vec![vec![0.0; frame_count]; channel_count];
        interleaved_to_planar(&interleaved[..frame_count * channel_count], &mut channels);
        Ok((channels, sample_rate))
    }

    /// Build the immutable snapshot plus oscillator bank and publish both to the engine
    /// in a single message, tagged with the load's generation token. Loads are never
    /// partially applied: everything the engine will see is fully built here, in this
    /// non-real-time context, and the engine commits generations in order only.
    fn commit(
        engine: &EngineHandle,
        config: &EngineConfig,
        output_sample_rate: u32,
        collector_handle: &Handle,
        generation: u64,
        channels: Vec<Vec<f32>>,
        sample_rate: u32,
    ) -> Result<(usize, usize), Error> {
        let buffer = SampleBuffer::new(channels, sample_rate)?;
        if buffer.is_empty() {
            return Err(Error::BufferTooShort {
                frame_count: buffer.frame_count(),
            });
        }
        if buffer.frame_count() <= config.grain_length {
            log::warn!(
                "loaded buffer with {} frames is shorter than a {} frame grain: \
                 granular playback will stay silent",
                buffer.frame_count(),
                config.grain_length
            );
        }
        if sample_rate != output_sample_rate {
            log::warn!(
                "loaded buffer's sample rate {sample_rate} differs from the output rate \
                 {output_sample_rate}: playback will be transposed"
            );
        }

        let mut bank = Vec::with_capacity(config.wavetable_frequencies.len());
        if !config.wavetable_frequencies.is_empty() {
            let table = Arc::new(buffer.channel(0).to_vec());
            for hz in &config.wavetable_frequencies {
                let mut oscillator = WavetableOscillator::new(Arc::clone(&table));
                oscillator.set_frequency(*hz, output_sample_rate);
                bank.push(oscillator);
            }
        }

        let frame_count = buffer.frame_count();
        let channel_count = buffer.channel_count();
        engine.send_message(EngineMessage::SetSource {
            generation,
            sample: Shared::new(collector_handle, buffer),
            oscillators: Owned::new(collector_handle, bank),
        })?;
        Ok((frame_count, channel_count))
    }
}

impl Drop for FileLoader {
    fn drop(&mut self) {
        self.collector.collect();
    }
}

// -------------------------------------------------------------------------------------------------
