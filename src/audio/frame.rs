use crate::error::WaveformResult;

/// Properties of the selected audio track, fixed once the input is open.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrackDescriptor {
    pub sample_rate: u32,
    pub channels: usize,
    /// Decoder-native sample format name (e.g. "s16", "f32"); frames are always delivered as f32.
    pub sample_format: String,
    /// Total duration in sample frames (one frame = one sample per channel).
    pub total_samples: u64,
    /// Timestamp units as (numerator, denominator) seconds.
    pub time_base: (u32, u32),
}

impl AudioTrackDescriptor {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / self.sample_rate as f64
    }
}

/// A block of decoded audio, interleaved by channel. Owns its samples.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedFrame {
    pub samples: Vec<f32>,
    pub channels: usize,
    /// Presentation timestamp in the track's time base.
    pub pts: u64,
}

impl DecodedFrame {
    pub fn new(samples: Vec<f32>, channels: usize, pts: u64) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            pts,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate sample frames, each a slice of `channels` samples.
    pub fn sample_frames(&self) -> std::slice::ChunksExact<'_, f32> {
        self.samples.chunks_exact(self.channels)
    }
}

/// Pull side of the pipeline: a finite, forward-only sequence of decoded frames.
///
/// `Ok(None)` marks end of stream. Once a source has returned `None` or an error
/// it is not polled again.
pub trait FrameSource {
    fn descriptor(&self) -> &AudioTrackDescriptor;

    fn next_frame(&mut self) -> WaveformResult<Option<DecodedFrame>>;
}

/// Keeps frame timestamps monotonic, synthesising missing ones from the
/// number of sample frames handed out so far.
#[derive(Debug, Default)]
pub struct TimestampTracker {
    emitted: u64,
    last_pts: Option<u64>,
}

impl TimestampTracker {
    /// `ts` is the container timestamp already converted to sample units, if known.
    pub fn stamp(&mut self, ts: Option<u64>, frames: usize) -> u64 {
        let pts = match (ts, self.last_pts) {
            (Some(ts), Some(last)) => ts.max(last),
            (Some(ts), None) => ts,
            (None, _) => self.emitted,
        };
        self.last_pts = Some(pts);
        self.emitted += frames as u64;
        pts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_len_counts_sample_frames() {
        let frame = DecodedFrame::new(vec![0.0; 12], 2, 0);
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.sample_frames().count(), 6);
        assert!(DecodedFrame::new(Vec::new(), 2, 0).is_empty());
    }

    #[test]
    fn zero_channels_is_treated_as_mono() {
        let frame = DecodedFrame::new(vec![0.5; 4], 0, 0);
        assert_eq!(frame.channels, 1);
        assert_eq!(frame.len(), 4);
    }

    #[test]
    fn unset_timestamps_come_from_running_counter() {
        let mut ts = TimestampTracker::default();
        assert_eq!(ts.stamp(None, 100), 0);
        assert_eq!(ts.stamp(None, 50), 100);
        assert_eq!(ts.stamp(None, 10), 150);
        assert_eq!(ts.stamp(None, 1), 160);
    }

    #[test]
    fn container_timestamps_never_go_backwards() {
        let mut ts = TimestampTracker::default();
        assert_eq!(ts.stamp(Some(1000), 100), 1000);
        assert_eq!(ts.stamp(Some(900), 100), 1000);
        assert_eq!(ts.stamp(Some(1200), 100), 1200);
    }

    #[test]
    fn descriptor_duration() {
        let desc = AudioTrackDescriptor {
            sample_rate: 44_100,
            channels: 2,
            sample_format: "s16".into(),
            total_samples: 88_200,
            time_base: (1, 44_100),
        };
        assert!((desc.duration_secs() - 2.0).abs() < 1e-9);
    }
}
