//! Play a sound file through the granular engine on the default audio device.
//!
//! Run with: `cargo run --example play-grains -- <FILE> [GRAIN_LENGTH] [VOICE_COUNT]`

use std::time::Duration;

use grainbox::{
    CpalOutput, EngineConfig, Error, FileLoader, GranularEngine, LoadStatusEvent, OutputDevice,
    OutputSink,
};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let mut args = std::env::args().skip(1);
    let file_path = args.next().unwrap_or_else(|| {
        eprintln!("usage: play-grains <FILE> [GRAIN_LENGTH] [VOICE_COUNT]");
        std::process::exit(1);
    });
    let grain_length = args
        .next()
        .map(|v| v.parse().expect("invalid grain length"))
        .unwrap_or(22050);
    let voice_count = args
        .next()
        .map(|v| v.parse().expect("invalid voice count"))
        .unwrap_or(5);

    // open the default audio device
    let device = CpalOutput::open()?;
    let mut sink = device.sink();

    // create an engine matching the device's layout
    let config = EngineConfig::default()
        .grain_length(grain_length)
        .voice_count(voice_count)
        .channel_count(sink.channel_count());
    let engine = GranularEngine::new(config, sink.sample_rate())?;
    let diagnostics_handle = engine.handle();

    // decode the file in the background and hand it to the engine
    let (status_send, status_recv) = crossbeam_channel::unbounded();
    let mut loader = FileLoader::new(&engine, Some(status_send));
    loader.load_file(file_path);

    // run the engine as the device's output source
    sink.play(engine);
    sink.resume();

    match status_recv.recv_timeout(Duration::from_secs(10)) {
        Ok(LoadStatusEvent::Loaded {
            path,
            frame_count,
            channel_count,
            sample_rate,
        }) => log::info!(
            "loaded {path}: {frame_count} frames, {channel_count} channels at {sample_rate} Hz"
        ),
        Ok(LoadStatusEvent::Failed { path, error }) => {
            log::error!("failed to load {path}: {error}");
            std::process::exit(1);
        }
        Err(err) => {
            log::error!("timed out waiting for the file load: {err}");
            std::process::exit(1);
        }
    }

    // let the texture play for a while
    std::thread::sleep(Duration::from_secs(20));
    log::info!(
        "rendered {} blocks ({} silent)",
        diagnostics_handle.diagnostics().rendered_blocks(),
        diagnostics_handle.diagnostics().silent_blocks()
    );

    loader.collect();
    sink.close();
    Ok(())
}
