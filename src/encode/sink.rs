use super::packetizer::{EncodedUnit, PcmPacketizer};
use crate::audio::frame::DecodedFrame;
use crate::error::WaveformResult;

/// Container writer. `finalize` writes the trailer and publishes the file in
/// one step; a muxer dropped without it must not leave a complete-looking file.
pub trait Muxer {
    fn write_unit(&mut self, unit: &EncodedUnit) -> WaveformResult<()>;

    fn finalize(&mut self) -> WaveformResult<()>;
}

/// Re-encode path: decoded frames in, container file out.
pub struct AudioEncodeSink {
    encoder: PcmPacketizer,
    muxer: Box<dyn Muxer>,
    units_written: u64,
    frames_written: u64,
}

impl AudioEncodeSink {
    pub fn new(encoder: PcmPacketizer, muxer: Box<dyn Muxer>) -> Self {
        Self {
            encoder,
            muxer,
            units_written: 0,
            frames_written: 0,
        }
    }

    pub fn write_frame(&mut self, frame: &DecodedFrame) -> WaveformResult<()> {
        self.encoder.send_frame(Some(frame))?;
        self.drain()
    }

    fn drain(&mut self) -> WaveformResult<()> {
        while let Some(unit) = self.encoder.receive_unit() {
            self.muxer.write_unit(&unit)?;
            self.units_written += 1;
            self.frames_written += unit.frames as u64;
        }
        Ok(())
    }

    /// Flush the encoder until it has nothing pending, then finalize the container.
    pub fn finalize(&mut self) -> WaveformResult<()> {
        self.encoder.send_frame(None)?;
        self.drain()?;
        log::debug!(
            "Encoder drained: {} units, {} sample frames",
            self.units_written,
            self.frames_written
        );
        self.muxer.finalize()
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
