use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

#[cfg(feature = "assert-allocs")]
use assert_no_alloc::assert_no_alloc;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    StreamConfig,
};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::{
    error::Error,
    output::{OutputDevice, OutputSink},
    source::{empty::EmptySource, Source, SourceTime},
};

// -------------------------------------------------------------------------------------------------

const PREFERRED_SAMPLE_FORMAT: cpal::SampleFormat = cpal::SampleFormat::F32;
const PREFERRED_SAMPLE_RATE: cpal::SampleRate = cpal::SampleRate(44100);
const PREFERRED_CHANNELS: cpal::ChannelCount = 2;
const PREFERRED_BUFFER_SIZE: cpal::BufferSize = if cfg!(debug_assertions) {
    cpal::BufferSize::Default
} else {
    cpal::BufferSize::Fixed(2048)
};

// -------------------------------------------------------------------------------------------------

/// Audio output device which plays into the system's default cpal output.
///
/// The cpal stream itself is owned by a dedicated thread (cpal streams must stay on the
/// thread that created them on some platforms); the device and its clonable
/// [`CpalSink`] only talk to that thread and to the audio callback through channels.
pub struct CpalOutput {
    sink: CpalSink,
}

impl CpalOutput {
    /// Open the system's default output device.
    pub fn open() -> Result<Self, Error> {
        let playback_pos = Arc::new(AtomicU64::new(0));
        let (callback_send, callback_recv) = bounded(16);
        let (stream_send, stream_recv) = bounded(16);
        let (open_send, open_recv) = bounded(1);

        // the stream thread opens the device and then serves stream control messages
        thread::Builder::new()
            .name("audio_output".to_string())
            .spawn({
                let playback_pos = Arc::clone(&playback_pos);
                move || Stream::run(playback_pos, callback_recv, stream_recv, open_send)
            })
            .map_err(|err| Error::OutputDeviceError(Box::new(err)))?;

        // wait for the stream thread to report the device's actual config
        let (channel_count, sample_rate) = open_recv
            .recv()
            .map_err(|err| Error::OutputDeviceError(Box::new(err)))??;

        let sink = CpalSink {
            channel_count,
            sample_rate,
            volume: 1.0,
            playback_pos,
            callback_send,
            stream_send,
        };
        Ok(Self { sink })
    }

    fn preferred_output_config(
        device: &cpal::Device,
    ) -> Result<cpal::SupportedStreamConfig, Error> {
        for s in device.supported_output_configs()? {
            let rates = s.min_sample_rate()..=s.max_sample_rate();
            if s.channels() == PREFERRED_CHANNELS
                && s.sample_format() == PREFERRED_SAMPLE_FORMAT
                && rates.contains(&PREFERRED_SAMPLE_RATE)
            {
                return Ok(s.with_sample_rate(PREFERRED_SAMPLE_RATE));
            }
        }

        Ok(device.default_output_config()?)
    }
}

impl OutputDevice for CpalOutput {
    type Sink = CpalSink;

    fn sink(&self) -> Self::Sink {
        self.sink.clone()
    }
}

// -------------------------------------------------------------------------------------------------

/// Clonable controller of a [`CpalOutput`] stream.
#[derive(Clone)]
pub struct CpalSink {
    channel_count: usize,
    sample_rate: u32,
    volume: f32,
    playback_pos: Arc<AtomicU64>,
    callback_send: Sender<CallbackMsg>,
    stream_send: Sender<StreamMsg>,
}

impl CpalSink {
    fn send_to_callback(&self, msg: CallbackMsg) {
        if self.callback_send.send(msg).is_err() {
            log::error!("output stream thread is dead");
        }
    }

    fn send_to_stream(&self, msg: StreamMsg) {
        if self.stream_send.send(msg).is_err() {
            log::error!("output stream thread is dead");
        }
    }
}

impl OutputSink for CpalSink {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_position(&self) -> u64 {
        self.playback_pos.load(Ordering::Relaxed)
    }

    fn volume(&self) -> f32 {
        self.volume
    }
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.send_to_callback(CallbackMsg::SetVolume(volume));
    }

    fn play(&mut self, source: impl Source) {
        // ensure source has our sample rate and channel layout
        assert_eq!(source.channel_count(), self.channel_count());
        assert_eq!(source.sample_rate(), self.sample_rate());
        // send message to activate it in the callback
        self.send_to_callback(CallbackMsg::PlaySource(Box::new(source)));
    }

    fn stop(&mut self) {
        self.send_to_callback(CallbackMsg::PlaySource(Box::new(EmptySource)));
    }

    fn pause(&mut self) {
        self.send_to_stream(StreamMsg::Pause);
        self.send_to_callback(CallbackMsg::Pause);
    }

    fn resume(&mut self) {
        self.send_to_stream(StreamMsg::Resume);
        self.send_to_callback(CallbackMsg::Resume);
    }

    fn close(&mut self) {
        self.send_to_stream(StreamMsg::Close);
    }
}

// -------------------------------------------------------------------------------------------------

enum StreamMsg {
    Pause,
    Resume,
    Close,
}

enum CallbackMsg {
    PlaySource(Box<dyn Source>),
    SetVolume(f32),
    Pause,
    Resume,
}

// -------------------------------------------------------------------------------------------------

struct Stream;

impl Stream {
    /// Open the default device and serve stream control messages until closed.
    /// Runs on the dedicated stream thread; the cpal stream never leaves it.
    fn run(
        playback_pos: Arc<AtomicU64>,
        callback_recv: Receiver<CallbackMsg>,
        stream_recv: Receiver<StreamMsg>,
        open_send: Sender<Result<(usize, u32), Error>>,
    ) {
        let stream = match Self::open(playback_pos, callback_recv) {
            Ok((stream, channel_count, sample_rate)) => {
                if open_send.send(Ok((channel_count, sample_rate))).is_err() {
                    return;
                }
                stream
            }
            Err(err) => {
                let _ = open_send.send(Err(err));
                return;
            }
        };

        while let Ok(msg) = stream_recv.recv() {
            match msg {
                StreamMsg::Pause => {
                    log::debug!("pausing audio output stream");
                    if let Err(err) = stream.pause() {
                        log::error!("failed to stop stream: {err}");
                    }
                }
                StreamMsg::Resume => {
                    log::debug!("resuming audio output stream");
                    if let Err(err) = stream.play() {
                        log::error!("failed to start stream: {err}");
                    }
                }
                StreamMsg::Close => {
                    log::debug!("closing audio output stream");
                    let _ = stream.pause();
                    break;
                }
            }
        }
    }

    fn open(
        playback_pos: Arc<AtomicU64>,
        callback_recv: Receiver<CallbackMsg>,
    ) -> Result<(cpal::Stream, usize, u32), Error> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(cpal::DefaultStreamConfigError::DeviceNotAvailable)?;
        if let Ok(name) = device.name() {
            log::info!("using audio device: {name}");
        }

        let supported = CpalOutput::preferred_output_config(&device)?;
        let channel_count = supported.channels() as usize;
        let sample_rate = supported.sample_rate().0;
        let config = StreamConfig {
            buffer_size: PREFERRED_BUFFER_SIZE,
            ..supported.config()
        };

        let mut callback = StreamCallback {
            callback_recv,
            source: Box::new(EmptySource),
            volume: 1.0,
            playback_pos,
            playback_pos_instant: Instant::now(),
            playing: false,
        };

        log::info!("opening output stream: {config:?}");
        let stream = device.build_output_stream(
            &config,
            move |output, _| {
                callback.write_samples(output);
            },
            |err| {
                log::error!("audio output error: {err}");
            },
            None,
        )?;

        Ok((stream, channel_count, sample_rate))
    }
}

// -------------------------------------------------------------------------------------------------

struct StreamCallback {
    callback_recv: Receiver<CallbackMsg>,
    source: Box<dyn Source>,
    playback_pos: Arc<AtomicU64>,
    playback_pos_instant: Instant,
    playing: bool,
    volume: f32,
}

impl StreamCallback {
    fn write_samples(&mut self, output: &mut [f32]) {
        // Process any pending control messages.
        while let Ok(msg) = self.callback_recv.try_recv() {
            match msg {
                CallbackMsg::PlaySource(src) => {
                    self.source = src;
                }
                CallbackMsg::SetVolume(volume) => {
                    self.volume = volume;
                }
                CallbackMsg::Pause => {
                    self.playing = false;
                }
                CallbackMsg::Resume => {
                    self.playing = true;
                }
            }
        }

        let written = if self.playing {
            // Write out as many samples as possible from the audio source.
            let time = SourceTime {
                pos_in_frames: self.playback_pos.load(Ordering::Relaxed)
                    / self.source.channel_count().max(1) as u64,
                pos_instant: self.playback_pos_instant,
            };

            #[cfg(not(feature = "assert-allocs"))]
            let written = self.source.write(output, &time);
            #[cfg(feature = "assert-allocs")]
            let written = assert_no_alloc(|| self.source.write(output, &time));

            // Apply the global volume level.
            output[..written].iter_mut().for_each(|s| *s *= self.volume);

            // Advance playback pos.
            self.playback_pos
                .fetch_add(output.len() as u64, Ordering::Relaxed);

            written
        } else {
            0
        };

        // Mute any remaining samples.
        output[written..].iter_mut().for_each(|s| *s = 0.0);
    }
}

// -------------------------------------------------------------------------------------------------

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(err: cpal::DefaultStreamConfigError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::SupportedStreamConfigsError> for Error {
    fn from(err: cpal::SupportedStreamConfigsError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(err: cpal::BuildStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}
