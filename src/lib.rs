#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod config;
mod engine;
mod error;
mod loader;
#[cfg(any(feature = "cpal-output", feature = "wav-output"))]
mod output;
mod sample;
mod source;

// public, flat re-exports
pub use error::Error;

pub use config::{EngineConfig, PlaybackMode};

pub use engine::{
    wavetable::WavetableOscillator, window, EngineDiagnostics, EngineHandle, EngineMessage,
    GranularEngine,
};

pub use loader::{FileLoader, LoadStatusEvent};

pub use sample::SampleBuffer;

pub use source::{empty::EmptySource, Source, SourceTime};

#[cfg(any(feature = "cpal-output", feature = "wav-output"))]
pub use output::{OutputDevice, OutputSink};

#[cfg(feature = "cpal-output")]
pub use output::{cpal::CpalOutput, DefaultOutputDevice, DefaultOutputSink};

#[cfg(feature = "wav-output")]
pub use output::wav::WavOutput;

// public mods
pub mod utils;
