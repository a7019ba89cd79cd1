use serde::{Deserialize, Serialize};

/// Which scalar of a column is drawn and exported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    /// Largest absolute sample value.
    #[default]
    Peak,
    /// Root mean square over every channel sample folded in.
    Rms,
}

/// Running statistics for one output column.
///
/// Folding is associative: two buckets over adjacent sample runs merge into the
/// bucket over their union, so no raw samples are ever buffered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnBucket {
    /// Sample frames folded in.
    pub count: u64,
    /// Individual channel samples folded in (count * channels).
    pub values: u64,
    pub min: f32,
    pub max: f32,
    pub sum_sq: f64,
}

impl Default for ColumnBucket {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl ColumnBucket {
    pub const EMPTY: Self = Self {
        count: 0,
        values: 0,
        min: 0.0,
        max: 0.0,
        sum_sq: 0.0,
    };

    /// Fold one sample frame (all of its channels) into the bucket.
    #[inline]
    pub fn fold_frame(&mut self, channels: &[f32]) {
        for &s in channels {
            // NaN never wins a comparison, so it cannot poison min/max.
            if self.values == 0 {
                self.min = s;
                self.max = s;
            } else {
                self.min = self.min.min(s);
                self.max = self.max.max(s);
            }
            self.sum_sq += (s as f64) * (s as f64);
            self.values += 1;
        }
        self.count += 1;
    }

    pub fn merge(&mut self, other: &ColumnBucket) {
        if other.values == 0 {
            self.count += other.count;
            return;
        }
        if self.values == 0 {
            self.min = other.min;
            self.max = other.max;
        } else {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
        self.sum_sq += other.sum_sq;
        self.values += other.values;
        self.count += other.count;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn peak(&self) -> f32 {
        self.min.abs().max(self.max.abs())
    }

    pub fn rms(&self) -> f32 {
        if self.values == 0 {
            return 0.0;
        }
        (self.sum_sq / self.values as f64).sqrt() as f32
    }

    pub fn value(&self, kind: AggregateKind) -> f32 {
        match kind {
            AggregateKind::Peak => self.peak(),
            AggregateKind::Rms => self.rms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_of(samples: &[f32]) -> ColumnBucket {
        let mut b = ColumnBucket::EMPTY;
        for s in samples {
            b.fold_frame(std::slice::from_ref(s));
        }
        b
    }

    #[test]
    fn empty_bucket_is_identity() {
        let b = ColumnBucket::EMPTY;
        assert_eq!(b.peak(), 0.0);
        assert_eq!(b.rms(), 0.0);
        assert!(b.is_empty());
    }

    #[test]
    fn silence_aggregates_to_zero() {
        let b = bucket_of(&[0.0; 10]);
        assert_eq!(b.count, 10);
        assert_eq!(b.value(AggregateKind::Peak), 0.0);
        assert_eq!(b.value(AggregateKind::Rms), 0.0);
    }

    #[test]
    fn peak_and_envelope() {
        let b = bucket_of(&[0.25, -0.75, 0.5]);
        assert_eq!(b.min, -0.75);
        assert_eq!(b.max, 0.5);
        assert_eq!(b.peak(), 0.75);
    }

    #[test]
    fn offset_column_keeps_true_extremes() {
        let b = bucket_of(&[0.3, 0.4]);
        assert_eq!(b.min, 0.3);
        assert_eq!(b.max, 0.4);
        assert_eq!(b.peak(), 0.4);
    }

    #[test]
    fn rms_of_square_wave() {
        let b = bucket_of(&[0.5, -0.5, 0.5, -0.5]);
        assert!((b.rms() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stereo_frame_counts_once() {
        let mut b = ColumnBucket::EMPTY;
        b.fold_frame(&[0.1, -0.9]);
        assert_eq!(b.count, 1);
        assert_eq!(b.values, 2);
        assert_eq!(b.peak(), 0.9);
    }

    #[test]
    fn merge_equals_folding_the_union() {
        let samples = [0.1, -0.4, 0.8, 0.05, -0.2, 0.3];
        let whole = bucket_of(&samples);
        let mut left = bucket_of(&samples[..2]);
        left.merge(&bucket_of(&samples[2..]));
        assert_eq!(left.count, whole.count);
        assert_eq!(left.min, whole.min);
        assert_eq!(left.max, whole.max);
        assert!((left.rms() - whole.rms()).abs() < 1e-6);
    }
}
