use std::path::Path;

use serde::Serialize;

use crate::error::{WaveformError, WaveformResult};
use crate::waveform::column::AggregateKind;
use crate::waveform::WaveformImage;

/// On-disk shape of a waveform's column data.
#[derive(Debug, Serialize)]
pub struct WaveformDocument {
    pub width: usize,
    pub samples_per_column: u64,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub aggregate: AggregateKind,
    pub values: Vec<f32>,
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

impl WaveformDocument {
    pub fn new(image: &WaveformImage, kind: AggregateKind) -> Self {
        Self {
            width: image.width,
            samples_per_column: image.samples_per_column,
            sample_rate: image.sample_rate,
            duration_secs: image.duration_secs(),
            aggregate: kind,
            values: image.values(kind),
            min: image.columns.iter().map(|c| c.min).collect(),
            max: image.columns.iter().map(|c| c.max).collect(),
        }
    }
}

pub fn write_json(path: &Path, image: &WaveformImage, kind: AggregateKind) -> WaveformResult<()> {
    let doc = WaveformDocument::new(image, kind);
    let body = serde_json::to_string(&doc)
        .map_err(|e| WaveformError::write(format!("serializing waveform: {}", e)))?;
    std::fs::write(path, body)
        .map_err(|e| WaveformError::write(format!("{}: {}", path.display(), e)))?;
    log::info!("Wrote {} columns to {}", image.width, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::column::ColumnBucket;

    #[test]
    fn document_carries_every_column() {
        let mut loud = ColumnBucket::EMPTY;
        loud.fold_frame(&[-0.5]);
        loud.fold_frame(&[0.25]);
        let image = WaveformImage {
            width: 3,
            samples_per_column: 2,
            sample_rate: 4,
            decoded_samples: 6,
            columns: vec![ColumnBucket::EMPTY, loud, ColumnBucket::EMPTY],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave_m.json");
        write_json(&path, &image, AggregateKind::Peak).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["width"], 3);
        assert_eq!(parsed["aggregate"], "peak");
        assert_eq!(parsed["duration_secs"], 1.5);
        assert_eq!(parsed["values"], serde_json::json!([0.0, 0.5, 0.0]));
        assert_eq!(parsed["min"][1], -0.5);
        assert_eq!(parsed["max"][1], 0.25);
    }
}
