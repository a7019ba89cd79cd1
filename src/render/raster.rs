use std::path::Path;

use crate::error::{WaveformError, WaveformResult};
use crate::waveform::WaveformImage;

#[derive(Clone, Debug, PartialEq)]
pub struct RenderStyle {
    pub foreground: [u8; 3],
    pub background: [u8; 3],
    /// Stretch the loudest column to the full height instead of drawing at 0 dBFS scale.
    pub normalize: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            foreground: [0x30, 0x30, 0x30],
            background: [0xff, 0xff, 0xff],
            normalize: false,
        }
    }
}

/// An RGBA pixel buffer, rows top to bottom.
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    fn put(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 3].copy_from_slice(&rgb);
        self.pixels[i + 3] = 255;
    }
}

/// Draw one vertical bar per column, spanning the column's signed envelope
/// around the horizontal centre line. Bars always touch the centre line.
pub fn emit(image: &WaveformImage, height: u32, style: &RenderStyle) -> WaveformResult<Raster> {
    let height = height.max(1);
    let too_large =
        || WaveformError::AllocationFailed(format!("{}x{} image", image.width, height));
    let width = u32::try_from(image.width).map_err(|_| too_large())?;
    let len = image
        .width
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(too_large)?;

    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|e| WaveformError::AllocationFailed(format!("{}x{} image: {}", width, height, e)))?;
    let background = [style.background[0], style.background[1], style.background[2], 255];
    for _ in 0..len / 4 {
        pixels.extend_from_slice(&background);
    }
    let mut raster = Raster {
        width,
        height,
        pixels,
    };

    let scale = if style.normalize {
        let peak = image.max_peak();
        if peak > 0.0 { 1.0 / peak } else { 1.0 }
    } else {
        1.0
    };

    let half = (height - 1) as f32 / 2.0;
    let to_row = |v: f32| -> u32 {
        let v = (v * scale).clamp(-1.0, 1.0);
        (half - v * half).round().clamp(0.0, (height - 1) as f32) as u32
    };

    for (x, column) in image.columns.iter().take(width as usize).enumerate() {
        let top = to_row(column.max.max(0.0));
        let bottom = to_row(column.min.min(0.0));
        for y in top..=bottom {
            raster.put(x as u32, y, style.foreground);
        }
    }

    Ok(raster)
}

pub fn write_png(path: &Path, raster: Raster) -> WaveformResult<()> {
    let Raster { width, height, pixels } = raster;
    let img = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| WaveformError::write("pixel buffer does not match image size"))?;
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| WaveformError::write(format!("{}: {}", path.display(), e)))?;
    log::info!("Wrote {}x{} image to {}", width, height, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::column::ColumnBucket;

    fn image_of(envelopes: &[(f32, f32)]) -> WaveformImage {
        let columns = envelopes
            .iter()
            .map(|&(min, max)| {
                let mut b = ColumnBucket::EMPTY;
                b.fold_frame(&[min, max]);
                b
            })
            .collect::<Vec<_>>();
        WaveformImage {
            width: columns.len(),
            samples_per_column: 1,
            sample_rate: 8_000,
            decoded_samples: columns.len() as u64,
            columns,
        }
    }

    fn column_rows(raster: &Raster, x: u32, fg: [u8; 3]) -> Vec<u32> {
        (0..raster.height)
            .filter(|&y| {
                let i = ((y * raster.width + x) * 4) as usize;
                raster.pixels[i..i + 3] == fg
            })
            .collect()
    }

    #[test]
    fn buffer_has_requested_dimensions() {
        let raster = emit(&image_of(&[(0.0, 0.0); 12]), 140, &RenderStyle::default()).unwrap();
        assert_eq!(raster.width, 12);
        assert_eq!(raster.height, 140);
        assert_eq!(raster.pixels.len(), 12 * 140 * 4);
    }

    #[test]
    fn silent_column_is_a_centre_dot() {
        let style = RenderStyle::default();
        let raster = emit(&image_of(&[(0.0, 0.0)]), 11, &style).unwrap();
        assert_eq!(column_rows(&raster, 0, style.foreground), vec![5]);
    }

    #[test]
    fn full_scale_column_spans_height() {
        let style = RenderStyle::default();
        let raster = emit(&image_of(&[(-1.0, 1.0), (0.0, 0.5)]), 11, &style).unwrap();
        assert_eq!(column_rows(&raster, 0, style.foreground).len(), 11);
        let half = column_rows(&raster, 1, style.foreground);
        assert_eq!(half.first().copied(), Some(3));
        assert_eq!(half.last().copied(), Some(5));
    }

    #[test]
    fn normalize_stretches_quiet_audio() {
        let style = RenderStyle {
            normalize: true,
            ..RenderStyle::default()
        };
        let raster = emit(&image_of(&[(-0.1, 0.1)]), 11, &style).unwrap();
        assert_eq!(column_rows(&raster, 0, style.foreground).len(), 11);
    }

    #[test]
    fn offset_column_still_touches_centre() {
        let style = RenderStyle::default();
        let raster = emit(&image_of(&[(0.2, 0.6)]), 11, &style).unwrap();
        let rows = column_rows(&raster, 0, style.foreground);
        assert_eq!(rows.first().copied(), Some(2));
        assert_eq!(rows.last().copied(), Some(5));
    }

    #[test]
    fn oversized_image_is_an_error_not_a_panic() {
        let image = WaveformImage {
            width: usize::MAX / 2,
            samples_per_column: 1,
            sample_rate: 8_000,
            decoded_samples: 0,
            columns: Vec::new(),
        };
        let err = emit(&image, 3, &RenderStyle::default()).err();
        assert!(matches!(err, Some(WaveformError::AllocationFailed(_))));
    }

    #[test]
    fn png_round_trips_through_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.png");
        let raster = emit(&image_of(&[(-0.5, 0.5); 20]), 30, &RenderStyle::default()).unwrap();
        write_png(&path, raster).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 30));
    }
}
