mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod pipeline;
mod render;
mod waveform;

use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use cli::Cli;
use encode::EncodeOptions;
use pipeline::driver::{generate, GenerateRequest, MIN_WIDTH};
use pipeline::progress::{BarProgress, MachineProgress, NoProgress, ProgressObserver};
use render::raster::RenderStyle;
use waveform::WaveformImage;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut style = RenderStyle {
        normalize: cli.normalize,
        ..RenderStyle::default()
    };

    // Config values apply only where the CLI is still at its default
    let loaded = match cli.config.clone() {
        Some(path) => Some((config::load_config(&path)?, path)),
        None => config::find_config().and_then(|path| match config::load_config(&path) {
            Ok(cfg) => Some((cfg, path)),
            Err(e) => {
                log::warn!("Ignoring config: {}", e);
                None
            }
        }),
    };
    if let Some((cfg, path)) = loaded {
        log::info!("Loaded config from {}", path.display());
        if cli.width == config::default_width() { cli.width = cfg.waveform.width; }
        if cli.small_width == config::default_small_width() { cli.small_width = cfg.waveform.small_width; }
        if cli.height == config::default_height() { cli.height = cfg.image.height; }
        if cli.aggregate == Default::default() { cli.aggregate = cfg.waveform.aggregate; }
        if cli.codec.is_none() { cli.codec = cfg.encode.codec.clone(); }
        if cli.bitrate.is_none() { cli.bitrate = cfg.encode.bitrate.clone(); }
        style = RenderStyle {
            normalize: cli.normalize || cfg.image.normalize,
            ..cfg.image.style()
        };
    }

    let input = cli.input_path().cloned().context("You have to specify an input file")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    // A too small width would make the per-column fold very large.
    if cli.width < MIN_WIDTH || cli.small_width < MIN_WIDTH {
        anyhow::bail!("Please specify widths of at least {}", MIN_WIDTH);
    }

    log::info!("waveformgen v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Input: {}", input.display());
    if let Some(ref output) = cli.output {
        log::info!("Output: {}", output.display());
    }
    log::info!("Widths: {} / {}, height {}", cli.width, cli.small_width, cli.height);

    let request = GenerateRequest {
        input: input.clone(),
        output: cli.output.clone(),
        widths: vec![cli.width, cli.small_width],
        encode: EncodeOptions {
            codec: cli.codec.clone(),
            bitrate: cli.bitrate.clone(),
        },
    };

    let mut progress: Box<dyn ProgressObserver> = if cli.progress {
        Box::new(MachineProgress::new(std::io::stdout()))
    } else if std::io::stderr().is_terminal() {
        Box::new(BarProgress::default())
    } else {
        Box::new(NoProgress)
    };

    let outcome = match generate(&request, progress.as_mut(), None) {
        Ok(outcome) => outcome,
        Err(err) => anyhow::bail!(
            "{}",
            error::last_error_message().unwrap_or_else(|| err.to_string())
        ),
    };

    let [full, small] = <[WaveformImage; 2]>::try_from(outcome.images)
        .map_err(|_| anyhow::anyhow!("expected two waveforms"))?;

    let wants_default = cli.image.is_none()
        && cli.small_image.is_none()
        && cli.json.is_none()
        && cli.small_json.is_none();
    let json = cli.json.clone().or_else(|| wants_default.then(|| sibling(&input, "_m.json")));
    let small_json = cli
        .small_json
        .clone()
        .or_else(|| wants_default.then(|| sibling(&input, "_s.json")));

    for (image, png, json) in [
        (&full, cli.image.as_ref(), json.as_ref()),
        (&small, cli.small_image.as_ref(), small_json.as_ref()),
    ] {
        if let Some(path) = png {
            let raster = render::raster::emit(image, cli.height, &style)?;
            render::raster::write_png(path, raster)?;
        }
        if let Some(path) = json {
            render::json::write_json(path, image, cli.aggregate)?;
        }
    }

    log::info!(
        "Done: {:.1}s of audio ({:.1}s decoded), {} samples per column at width {}",
        outcome.track.duration_secs(),
        full.duration_secs(),
        full.samples_per_column,
        full.width
    );
    Ok(())
}

/// `<input><suffix>` next to the input file.
fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
