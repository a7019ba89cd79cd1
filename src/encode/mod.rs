pub mod ffmpeg;
pub mod packetizer;
pub mod sink;

use std::path::Path;

use crate::audio::frame::AudioTrackDescriptor;
use crate::error::{WaveformError, WaveformResult};
use ffmpeg::FfmpegMuxer;
use packetizer::PcmPacketizer;
use sink::AudioEncodeSink;

/// Re-encoded output is always stereo.
pub const OUTPUT_CHANNELS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3,
    Ogg,
    Opus,
    Flac,
    Wav,
    M4a,
    Aac,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> WaveformResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                WaveformError::UnsupportedFormat(format!("{} has no extension", path.display()))
            })?;
        Ok(match ext.as_str() {
            "mp3" => Self::Mp3,
            "ogg" | "oga" => Self::Ogg,
            "opus" => Self::Opus,
            "flac" => Self::Flac,
            "wav" => Self::Wav,
            "m4a" | "mp4" => Self::M4a,
            "aac" => Self::Aac,
            other => return Err(WaveformError::UnsupportedFormat(format!(".{}", other))),
        })
    }

    pub fn muxer_name(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::M4a => "ipod",
            Self::Aac => "adts",
        }
    }

    pub fn default_codec(self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Ogg => "libvorbis",
            Self::Opus => "libopus",
            Self::Flac => "flac",
            Self::Wav => "pcm_s16le",
            Self::M4a | Self::Aac => "aac",
        }
    }

    /// Sample frames per codec frame.
    pub fn frame_size(self) -> usize {
        match self {
            Self::Mp3 => 1152,
            Self::M4a | Self::Aac => 1024,
            Self::Opus => 960,
            _ => 4096,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EncodeOptions {
    pub codec: Option<String>,
    pub bitrate: Option<String>,
}

/// Open the re-encode path for `path`, keeping the input's sample rate.
pub fn open_output(
    path: &Path,
    track: &AudioTrackDescriptor,
    options: &EncodeOptions,
) -> WaveformResult<AudioEncodeSink> {
    let format = OutputFormat::from_path(path)?;
    let muxer = FfmpegMuxer::new(
        path,
        format,
        track.sample_rate,
        OUTPUT_CHANNELS,
        options.codec.as_deref(),
        options.bitrate.as_deref(),
    )?;
    let encoder = PcmPacketizer::new(OUTPUT_CHANNELS, format.frame_size());
    Ok(AudioEncodeSink::new(encoder, Box::new(muxer)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.MP3")).unwrap(), OutputFormat::Mp3);
        assert_eq!(OutputFormat::from_path(Path::new("a.m4a")).unwrap().muxer_name(), "ipod");
        assert_eq!(OutputFormat::from_path(Path::new("a.aac")).unwrap().frame_size(), 1024);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        for name in ["a.xyz", "noext"] {
            assert!(matches!(
                OutputFormat::from_path(Path::new(name)),
                Err(WaveformError::UnsupportedFormat(_))
            ));
        }
    }
}
