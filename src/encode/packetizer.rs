use crate::audio::frame::DecodedFrame;
use crate::error::{WaveformError, WaveformResult};

/// One unit of encoder output, ready for the muxer.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedUnit {
    /// Interleaved little-endian f32 samples.
    pub data: Vec<u8>,
    /// Timestamp of the first sample frame, in samples.
    pub pts: u64,
    /// Sample frames carried.
    pub frames: usize,
}

/// Repacketizes decoded frames into fixed-size codec frames.
///
/// Input is buffered until a whole codec frame is available, so output lags
/// input; after `send_frame(None)` the remaining tail comes out on subsequent
/// `receive_unit` calls until it returns `None`.
#[derive(Debug)]
pub struct PcmPacketizer {
    channels: usize,
    frame_size: usize,
    pending: Vec<f32>,
    next_pts: u64,
    started: bool,
    draining: bool,
}

impl PcmPacketizer {
    pub fn new(channels: usize, frame_size: usize) -> Self {
        Self {
            channels: channels.max(1),
            frame_size: frame_size.max(1),
            pending: Vec::new(),
            next_pts: 0,
            started: false,
            draining: false,
        }
    }

    /// Buffered sample frames not yet handed out.
    pub fn pending_frames(&self) -> usize {
        self.pending.len() / self.channels
    }

    /// Queue a decoded frame, or `None` to start draining.
    pub fn send_frame(&mut self, frame: Option<&DecodedFrame>) -> WaveformResult<()> {
        let Some(frame) = frame else {
            self.draining = true;
            return Ok(());
        };
        if self.draining {
            return Err(WaveformError::encode("frame sent after end of stream"));
        }
        if !self.started {
            self.next_pts = frame.pts;
            self.started = true;
        }

        self.pending
            .try_reserve(frame.len() * self.channels)
            .map_err(|e| WaveformError::AllocationFailed(format!("encoder buffer: {}", e)))?;
        for src in frame.sample_frames() {
            remap_channels(src, self.channels, &mut self.pending);
        }
        Ok(())
    }

    /// Next complete unit, or the drained tail once draining.
    pub fn receive_unit(&mut self) -> Option<EncodedUnit> {
        let available = self.pending_frames();
        let frames = if available >= self.frame_size {
            self.frame_size
        } else if self.draining && available > 0 {
            available
        } else {
            return None;
        };

        let data = self
            .pending
            .drain(..frames * self.channels)
            .flat_map(f32::to_le_bytes)
            .collect();
        let unit = EncodedUnit {
            data,
            pts: self.next_pts,
            frames,
        };
        self.next_pts += frames as u64;
        Some(unit)
    }
}

/// Append one sample frame with `src.len()` channels as `out` channels.
fn remap_channels(src: &[f32], out: usize, dst: &mut Vec<f32>) {
    match (src.len(), out) {
        (n, m) if n == m => dst.extend_from_slice(src),
        (1, m) => dst.extend(std::iter::repeat(src[0]).take(m)),
        (n, 1) => dst.push(src.iter().sum::<f32>() / n as f32),
        (n, m) if n > m => dst.extend_from_slice(&src[..m]),
        (n, m) => {
            dst.extend_from_slice(src);
            dst.extend(std::iter::repeat(0.0).take(m - n));
        }
    }
}
