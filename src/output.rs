// Note: when both output features are enabled, cpal is the default device
#[cfg(feature = "cpal-output")]
pub mod cpal;
#[cfg(feature = "wav-output")]
pub mod wav;

/// The default audio output type.
#[cfg(feature = "cpal-output")]
pub type DefaultOutputDevice = cpal::CpalOutput;

/// The default audio output sink type.
#[cfg(feature = "cpal-output")]
pub type DefaultOutputSink = <DefaultOutputDevice as OutputDevice>::Sink;

use super::source::Source;

// -------------------------------------------------------------------------------------------------

/// OutputDevice controller.
pub trait OutputSink {
    /// Actual device's output sample buffer channel count.
    fn channel_count(&self) -> usize;
    /// Actual device's output sample rate.
    fn sample_rate(&self) -> u32;
    /// Actual device's output playhead position in **samples** (NOT frames).
    fn sample_position(&self) -> u64;

    /// Get actual output volume.
    fn volume(&self) -> f32;
    /// Set a new output volume.
    fn set_volume(&mut self, volume: f32);

    /// Play given source as main output source.
    fn play(&mut self, source: impl Source);
    /// Drop actual source, replacing it with silence.
    fn stop(&mut self);
    /// Pause playback without dropping the output source.
    fn pause(&mut self);
    /// Resume from paused playback.
    fn resume(&mut self);

    /// Release audio device.
    fn close(&mut self);
}

// -------------------------------------------------------------------------------------------------

/// OutputDevice implementation: provides a sink controller.
pub trait OutputDevice {
    type Sink: OutputSink;
    fn sink(&self) -> Self::Sink;
}
