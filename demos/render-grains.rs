//! Render a sound file through the granular engine into a wav file, offline.
//!
//! Run with: `cargo run --example render-grains -- <IN_FILE> <OUT_FILE> [SECONDS]`

use std::time::Duration;

use grainbox::{EngineConfig, Error, FileLoader, GranularEngine, WavOutput};

// -------------------------------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 44100;
const CHANNEL_COUNT: usize = 2;

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let mut args = std::env::args().skip(1);
    let (Some(in_path), Some(out_path)) = (args.next(), args.next()) else {
        eprintln!("usage: render-grains <IN_FILE> <OUT_FILE> [SECONDS]");
        std::process::exit(1);
    };
    let seconds = args
        .next()
        .map(|v| v.parse().expect("invalid duration"))
        .unwrap_or(10);

    let config = EngineConfig::default()
        .grain_length(11025)
        .voice_count(15)
        .channel_count(CHANNEL_COUNT)
        .rng_seed(0x9A17);
    let engine = GranularEngine::new(config, SAMPLE_RATE)?;

    let mut loader = FileLoader::new(&engine, None);
    loader.load_file_blocking(&in_path)?;

    log::info!("rendering {seconds}s of grains from {in_path} into {out_path}");
    let output = WavOutput::open(&out_path, SAMPLE_RATE, CHANNEL_COUNT)?;
    output.render(engine, Duration::from_secs(seconds))?;

    Ok(())
}
