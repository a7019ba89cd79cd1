use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::waveform::column::AggregateKind;

#[derive(Parser, Debug)]
#[command(
    name = "waveformgen",
    version,
    about = "Waveform image generator for audio files",
    disable_help_flag = true
)]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,

    /// Input audio file, alternative to the positional argument
    #[arg(short = 'i', long = "input", conflicts_with = "input")]
    pub input_flag: Option<PathBuf>,

    /// Re-encode the audio into this file (format from extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Width of the full waveform in columns
    #[arg(short = 'W', long, default_value_t = 1800)]
    pub width: usize,

    /// Width of the small waveform in columns
    #[arg(short = 'w', long, default_value_t = 800)]
    pub small_width: usize,

    /// Image height in pixels
    #[arg(short = 'h', short_alias = 'H', long, default_value_t = 140)]
    pub height: u32,

    /// Write the full waveform as PNG
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Write the small waveform as PNG
    #[arg(long)]
    pub small_image: Option<PathBuf>,

    /// Write the full waveform columns as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Write the small waveform columns as JSON
    #[arg(long)]
    pub small_json: Option<PathBuf>,

    /// Column statistic to draw and export
    #[arg(long, value_enum, default_value_t = AggregateKind::Peak)]
    pub aggregate: AggregateKind,

    /// Scale images so the loudest column fills the height
    #[arg(long)]
    pub normalize: bool,

    /// Audio codec for --output (ffmpeg encoder name)
    #[arg(long)]
    pub codec: Option<String>,

    /// Audio bitrate for --output (e.g. 128k)
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// Print duration and percent lines on stdout instead of a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Config file (default: ./waveformgen.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print help (`-h` is the height)
    #[arg(long = "help", action = ArgAction::Help)]
    _help: Option<bool>,
}

impl Cli {
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().or(self.input_flag.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_tool() {
        let cli = Cli::try_parse_from(["waveformgen", "song.mp3"]).unwrap();
        assert_eq!(cli.width, 1800);
        assert_eq!(cli.small_width, 800);
        assert_eq!(cli.height, 140);
        assert_eq!(cli.aggregate, AggregateKind::Peak);
        assert_eq!(cli.input_path(), Some(&PathBuf::from("song.mp3")));
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from([
            "waveformgen", "-i", "in.wav", "-o", "out.mp3", "-W", "1200", "-w", "400", "-h", "90",
        ])
        .unwrap();
        assert_eq!(cli.input_path(), Some(&PathBuf::from("in.wav")));
        assert_eq!(cli.output, Some(PathBuf::from("out.mp3")));
        assert_eq!((cli.width, cli.small_width, cli.height), (1200, 400, 90));
    }

    #[test]
    fn aggregate_kind_by_name() {
        let cli = Cli::try_parse_from(["waveformgen", "a.wav", "--aggregate", "rms"]).unwrap();
        assert_eq!(cli.aggregate, AggregateKind::Rms);
    }

    #[test]
    fn queue_worker_command_line() {
        let cli = Cli::try_parse_from([
            "waveformgen", "-i", "in.mp3", "-o", "out.mp3", "-h", "140", "-W", "1800", "-w", "800",
        ])
        .unwrap();
        assert_eq!(cli.height, 140);
        assert_eq!((cli.width, cli.small_width), (1800, 800));
        assert_eq!(cli.output, Some(PathBuf::from("out.mp3")));
    }

    #[test]
    fn upper_case_height_and_long_help() {
        let cli = Cli::try_parse_from(["waveformgen", "a.wav", "-H", "60"]).unwrap();
        assert_eq!(cli.height, 60);
        let err = Cli::try_parse_from(["waveformgen", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
