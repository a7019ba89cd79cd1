use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::frame::{AudioTrackDescriptor, DecodedFrame, FrameSource, TimestampTracker};
use crate::error::{WaveformError, WaveformResult};

/// Decoded sample stream for the first audio track of a media file.
pub struct SampleSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    /// Container timestamps are converted to sample units with this ratio when known.
    ts_scale: Option<(u64, u64)>,
    descriptor: AudioTrackDescriptor,
    sample_buf: Option<SampleBuffer<f32>>,
    timestamps: TimestampTracker,
    finished: bool,
}

impl SampleSource {
    /// Open `path`, select its first audio track and set up a decoder for it.
    ///
    /// When the container does not announce a length, the file is decoded once
    /// through a second handle to count samples.
    pub fn open(path: &Path) -> WaveformResult<Self> {
        let mut source = Self::open_track(path)?;

        if source.descriptor.total_samples == 0 {
            log::warn!(
                "{} does not announce its length, counting samples",
                path.display()
            );
            source.descriptor.total_samples = count_samples(path)?;
        }

        log::info!(
            "Opened {}: {}Hz (time base {}/{}), {} channel(s), {}, {} samples ({:.1}s)",
            path.display(),
            source.descriptor.sample_rate,
            source.descriptor.time_base.0,
            source.descriptor.time_base.1,
            source.descriptor.channels,
            source.descriptor.sample_format,
            source.descriptor.total_samples,
            source.descriptor.duration_secs()
        );

        Ok(source)
    }

    fn open_track(path: &Path) -> WaveformResult<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| WaveformError::open(format!("{}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| WaveformError::open(format!("{}: {}", path.display(), e)))?;

        let format = probed.format;

        let track = first_audio_track(format.tracks(), path)?;

        let params = &track.codec_params;
        let track_id = track.id;
        let sample_rate = params.sample_rate.unwrap_or_default();
        let channels = params.channels.map_or(1, |c| c.count());
        let sample_format = params
            .sample_format
            .map(|f| format!("{:?}", f).to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        let ts_scale = params.time_base.map(|tb| {
            (
                tb.numer as u64 * sample_rate as u64,
                tb.denom as u64,
            )
        });

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| WaveformError::DecoderUnavailable(format!("track #{}: {}", track_id, e)))?;

        let descriptor = AudioTrackDescriptor {
            sample_rate,
            channels,
            sample_format,
            total_samples: params.n_frames.unwrap_or(0),
            time_base: (1, sample_rate.max(1)),
        };

        Ok(Self {
            format,
            decoder,
            track_id,
            ts_scale,
            descriptor,
            sample_buf: None,
            timestamps: TimestampTracker::default(),
            finished: false,
        })
    }

    fn to_sample_units(&self, ts: u64) -> Option<u64> {
        self.ts_scale
            .filter(|&(_, denom)| denom > 0)
            .map(|(numer, denom)| ts.saturating_mul(numer) / denom)
    }
}

impl FrameSource for SampleSource {
    fn descriptor(&self) -> &AudioTrackDescriptor {
        &self.descriptor
    }

    fn next_frame(&mut self) -> WaveformResult<Option<DecodedFrame>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    log::warn!("Stream parameters changed, resetting decoder");
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(WaveformError::decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(WaveformError::decode(format!(
                        "packet at ts {}: {}",
                        packet.ts(),
                        e
                    )))
                }
            };

            // A packet can legitimately yield nothing yet (decoder priming).
            let num_frames = decoded.frames();
            if num_frames == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let too_small = self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < num_frames * spec.channels.count());
            if too_small {
                self.sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = self.sample_buf.as_mut() else {
                return Err(WaveformError::AllocationFailed("sample buffer".into()));
            };
            buf.copy_interleaved_ref(decoded);

            let samples = buf.samples().to_vec();
            let channels = spec.channels.count();
            let ts = self.to_sample_units(packet.ts());
            let pts = self.timestamps.stamp(ts, num_frames);

            return Ok(Some(DecodedFrame::new(samples, channels, pts)));
        }
    }
}

/// First track with a known codec and a sample rate.
fn first_audio_track<'a>(tracks: &'a [Track], path: &Path) -> WaveformResult<&'a Track> {
    tracks
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or_else(|| WaveformError::NoAudioTrack(path.display().to_string()))
}

/// Decode `path` through a fresh handle and return its length in sample frames.
pub fn count_samples(path: &Path) -> WaveformResult<u64> {
    let mut source = SampleSource::open_track(path)?;
    let mut total = 0u64;
    while let Some(frame) = source.next_frame()? {
        total += frame.len() as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_PCM_S16LE};

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize, value: impl Fn(usize) -> i16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                writer.write_sample(value(i)).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_every_sample_of_a_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 2, 8_000, 18_000, |i| if i % 2 == 0 { 16_384 } else { -16_384 });

        let mut source = SampleSource::open(&path).unwrap();
        let desc = source.descriptor().clone();
        assert_eq!(desc.sample_rate, 8_000);
        assert_eq!(desc.channels, 2);
        assert_eq!(desc.total_samples, 18_000);

        let mut total = 0usize;
        let mut last_pts = 0u64;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.channels, 2);
            assert!(frame.pts >= last_pts);
            last_pts = frame.pts;
            for s in &frame.samples {
                assert!((s.abs() - 0.5).abs() < 1e-3);
            }
            total += frame.len();
        }
        assert_eq!(total, 18_000);

        // exhausted sources stay exhausted
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn count_samples_matches_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 22_050, 5_000, |_| 0);
        assert_eq!(count_samples(&path).unwrap(), 5_000);
    }

    #[test]
    fn missing_file_is_open_failure() {
        let err = SampleSource::open(Path::new("/nonexistent/input.wav")).err().unwrap();
        assert!(matches!(err, WaveformError::OpenFailed(_)));
    }

    #[test]
    fn non_media_file_is_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"definitely not audio").unwrap();
        let err = SampleSource::open(&path).err().unwrap();
        assert!(matches!(err, WaveformError::OpenFailed(_)));
    }

    #[test]
    fn container_without_audio_track_is_rejected() {
        let path = Path::new("video_only.mkv");
        let err = first_audio_track(&[], path).err().unwrap();
        assert!(matches!(err, WaveformError::NoAudioTrack(_)));

        let tracks = [Track::new(0, CodecParameters::new())];
        let err = first_audio_track(&tracks, path).err().unwrap();
        assert!(matches!(err, WaveformError::NoAudioTrack(_)));
    }

    #[test]
    fn first_decodable_track_wins() {
        let mut audio = CodecParameters::new();
        audio.for_codec(CODEC_TYPE_PCM_S16LE).with_sample_rate(8_000);
        let tracks = [
            Track::new(0, CodecParameters::new()),
            Track::new(1, audio.clone()),
            Track::new(2, audio),
        ];
        let track = first_audio_track(&tracks, Path::new("mixed.mkv")).unwrap();
        assert_eq!(track.id, 1);
    }
}
