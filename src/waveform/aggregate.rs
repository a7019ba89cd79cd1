use super::column::ColumnBucket;
use super::WaveformImage;
use crate::audio::frame::DecodedFrame;
use crate::error::{WaveformError, WaveformResult};

/// Reduces a decoded sample stream to a fixed number of columns.
///
/// Every column but the last closes after exactly `samples_per_column` sample
/// frames; the last one absorbs whatever remains and closes on `flush`.
/// Bucket boundaries follow the running sample index, never per-frame division.
#[derive(Debug)]
pub struct ColumnAggregator {
    width: usize,
    samples_per_column: u64,
    current: ColumnBucket,
    columns: Vec<ColumnBucket>,
    position: u64,
    flushed: bool,
}

impl ColumnAggregator {
    pub fn new(total_samples: u64, width: usize) -> WaveformResult<Self> {
        if width == 0 {
            return Err(WaveformError::invalid_width("width must be non-zero"));
        }
        let samples_per_column = total_samples / width as u64;
        if samples_per_column == 0 {
            return Err(WaveformError::invalid_width(format!(
                "{} columns requested but the input only has {} samples",
                width, total_samples
            )));
        }

        let mut columns = Vec::new();
        columns.try_reserve_exact(width).map_err(|e| {
            WaveformError::AllocationFailed(format!("{} columns: {}", width, e))
        })?;

        Ok(Self {
            width,
            samples_per_column,
            current: ColumnBucket::EMPTY,
            columns,
            position: 0,
            flushed: false,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn samples_per_column(&self) -> u64 {
        self.samples_per_column
    }

    /// Sample frames folded in so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Columns closed so far, in stream order.
    pub fn columns(&self) -> &[ColumnBucket] {
        &self.columns
    }

    fn in_last_column(&self) -> bool {
        self.columns.len() + 1 >= self.width
    }

    /// Fold `frame` into the open bucket, closing as many buckets as its
    /// samples cross. Returns the buckets closed by this call.
    pub fn push(&mut self, frame: &DecodedFrame) -> &[ColumnBucket] {
        let first_closed = self.columns.len();
        let mut sample_frames = frame.sample_frames();
        let mut remaining = frame.len() as u64;

        while remaining > 0 {
            let take = if self.in_last_column() {
                remaining
            } else {
                (self.samples_per_column - self.current.count).min(remaining)
            };

            for channels in sample_frames.by_ref().take(take as usize) {
                self.current.fold_frame(channels);
            }
            remaining -= take;
            self.position += take;

            if !self.in_last_column() && self.current.count == self.samples_per_column {
                self.columns.push(std::mem::take(&mut self.current));
            }
        }

        &self.columns[first_closed..]
    }

    /// Close the open bucket if it holds any samples. It may be shorter (or,
    /// for the last column, longer) than `samples_per_column`.
    pub fn flush(&mut self) -> Option<ColumnBucket> {
        self.flushed = true;
        if self.current.is_empty() {
            return None;
        }
        let bucket = std::mem::take(&mut self.current);
        self.columns.push(bucket);
        Some(bucket)
    }

    /// Flush and package the columns, padding a short stream with silent
    /// columns so the image always has `width` entries.
    pub fn finish(mut self, sample_rate: u32) -> WaveformImage {
        if !self.flushed {
            self.flush();
        }
        if self.columns.len() < self.width {
            log::debug!(
                "Stream ended after {} of {} columns, padding",
                self.columns.len(),
                self.width
            );
            self.columns.resize(self.width, ColumnBucket::EMPTY);
        }

        WaveformImage {
            width: self.width,
            samples_per_column: self.samples_per_column,
            sample_rate,
            decoded_samples: self.position,
            columns: self.columns,
        }
    }
}
