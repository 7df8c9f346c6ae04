use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// Playback mode of a [`GranularEngine`](crate::GranularEngine).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, strum::EnumString, strum::Display, strum::VariantNames,
)]
#[repr(u8)]
pub enum PlaybackMode {
    /// Play randomly offset, Hann windowed grains of the loaded recording through an
    /// ensemble of voices.
    #[default]
    Granular,
    /// Treat the loaded recording as a single-cycle waveform and play it through a bank
    /// of interpolating wavetable oscillators.
    Wavetable,
}

// -------------------------------------------------------------------------------------------------

/// Configuration for a [`GranularEngine`](crate::GranularEngine).
///
/// Replaces what otherwise would be a set of compile-time constants: grain length, voice
/// count and output channel layout all are plain runtime values here, so differently
/// flavored engines are just differently configured instances of the same type.
///
/// ### Example
/// ```
/// use grainbox::EngineConfig;
///
/// // half-second grains at 44.1 kHz through 15 staggered voices
/// let config = EngineConfig::default()
///     .grain_length(22050)
///     .voice_count(15)
///     .rng_seed(0x5EED);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Length of a single grain in frames.
    pub grain_length: usize,
    /// Number of grain voices playing at once.
    pub voice_count: usize,
    /// Output channel count the engine renders into.
    pub channel_count: usize,
    /// Initial playback mode.
    pub playback_mode: PlaybackMode,
    /// Frequencies in Hz of the wavetable oscillator bank, built on each load.
    /// When empty, the wavetable mode stays silent.
    pub wavetable_frequencies: Vec<f32>,
    /// Seed for the per-voice grain offset generators. When set, synthesis is fully
    /// reproducible; when unset, voices are seeded from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grain_length: 22050,
            voice_count: 5,
            channel_count: 2,
            playback_mode: PlaybackMode::Granular,
            wavetable_frequencies: Vec::new(),
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grain length in frames.
    pub fn grain_length(mut self, grain_length: usize) -> Self {
        self.grain_length = grain_length;
        self
    }
    /// Set the number of grain voices.
    pub fn voice_count(mut self, voice_count: usize) -> Self {
        self.voice_count = voice_count;
        self
    }
    /// Set the output channel count.
    pub fn channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }
    /// Set the initial playback mode.
    pub fn playback_mode(mut self, mode: PlaybackMode) -> Self {
        self.playback_mode = mode;
        self
    }
    /// Set the wavetable oscillator bank frequencies in Hz.
    pub fn wavetable_frequencies(mut self, frequencies: Vec<f32>) -> Self {
        self.wavetable_frequencies = frequencies;
        self
    }
    /// Set a fixed seed for the grain offset generators.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Validate all config values.
    pub fn validate(&self) -> Result<(), Error> {
        if self.grain_length < 2 {
            return Err(Error::ParameterError(
                "Grain length must be at least 2 frames".to_string(),
            ));
        }
        if self.voice_count == 0 {
            return Err(Error::ParameterError(
                "Voice count must not be zero".to_string(),
            ));
        }
        if self.channel_count == 0 {
            return Err(Error::ParameterError(
                "Channel count must not be zero".to_string(),
            ));
        }
        if self
            .wavetable_frequencies
            .iter()
            .any(|hz| !hz.is_finite() || *hz < 0.0)
        {
            return Err(Error::ParameterError(
                "Wavetable frequencies must be finite and >= 0 Hz".to_string(),
            ));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(EngineConfig::default().validate().is_ok());

        assert!(EngineConfig::default().grain_length(1).validate().is_err());
        assert!(EngineConfig::default().voice_count(0).validate().is_err());
        assert!(EngineConfig::default().channel_count(0).validate().is_err());
        assert!(EngineConfig::default()
            .wavetable_frequencies(vec![440.0, f32::NAN])
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .wavetable_frequencies(vec![0.0, 110.0, 220.5])
            .validate()
            .is_ok());
    }

    #[test]
    fn playback_mode_strings() {
        use std::str::FromStr;
        assert_eq!(PlaybackMode::from_str("Granular"), Ok(PlaybackMode::Granular));
        assert_eq!(PlaybackMode::from_str("Wavetable"), Ok(PlaybackMode::Wavetable));
        assert_eq!(PlaybackMode::Wavetable.to_string(), "Wavetable");
    }
}
