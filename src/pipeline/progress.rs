use std::io::Write;

use indicatif::{ProgressBar, ProgressStyle};

use crate::audio::frame::AudioTrackDescriptor;

/// Receives pipeline progress, in sample frames.
pub trait ProgressObserver {
    fn start(&mut self, _track: &AudioTrackDescriptor) {}

    fn advance(&mut self, _position: u64) {}

    fn finish(&mut self) {}

    /// The run failed; `finish` will not be called.
    fn abandon(&mut self) {}
}

pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Interactive progress bar on stderr.
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ProgressObserver for BarProgress {
    fn start(&mut self, track: &AudioTrackDescriptor) {
        let pb = ProgressBar::new(track.total_samples);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {percent}% ({eta} remaining)")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.bar = Some(pb);
    }

    fn advance(&mut self, position: u64) {
        if let Some(pb) = &self.bar {
            pb.set_position(position);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }

    fn abandon(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.abandon();
        }
    }
}

/// Line protocol for supervising processes: the duration in whole seconds
/// first, then each new integer percentage. Readers tell them apart by
/// value, anything above 100 being the duration.
pub struct MachineProgress<W: Write> {
    out: W,
    total: u64,
    last_percent: Option<u64>,
}

impl<W: Write> MachineProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: 0,
            last_percent: None,
        }
    }

    fn emit(&mut self, value: u64) {
        if writeln!(self.out, "{}", value).and_then(|_| self.out.flush()).is_err() {
            log::debug!("Progress reader went away");
        }
    }
}

impl<W: Write> ProgressObserver for MachineProgress<W> {
    fn start(&mut self, track: &AudioTrackDescriptor) {
        self.total = track.total_samples;
        self.emit(track.duration_secs().round() as u64);
    }

    fn advance(&mut self, position: u64) {
        if self.total == 0 {
            return;
        }
        let percent = (position.saturating_mul(100) / self.total).min(100);
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.emit(percent);
        }
    }

    fn finish(&mut self) {
        if self.last_percent != Some(100) {
            self.last_percent = Some(100);
            self.emit(100);
        }
    }
}
