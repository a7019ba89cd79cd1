pub mod aggregate;
pub mod column;

use column::{AggregateKind, ColumnBucket};

/// One complete waveform: `width` columns derived from the whole stream.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformImage {
    pub width: usize,
    pub samples_per_column: u64,
    pub sample_rate: u32,
    /// Sample frames actually decoded (may differ from the announced length).
    pub decoded_samples: u64,
    pub columns: Vec<ColumnBucket>,
}

impl WaveformImage {
    pub fn values(&self, kind: AggregateKind) -> Vec<f32> {
        self.columns.iter().map(|c| c.value(kind)).collect()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.decoded_samples as f64 / self.sample_rate as f64
    }

    /// All columns merged into one bucket.
    pub fn overall(&self) -> ColumnBucket {
        self.columns.iter().fold(ColumnBucket::EMPTY, |mut acc, c| {
            acc.merge(c);
            acc
        })
    }

    /// Largest peak over all columns, used to scale drawings.
    pub fn max_peak(&self) -> f32 {
        self.overall().peak()
    }
}
