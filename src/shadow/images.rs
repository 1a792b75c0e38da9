use image::{DynamicImage, ImageReader};
use std::path::Path;

use super::{scaled_bitmap, BitmapShadow, ShadowSpec};
use crate::config::ShadowBounds;
use crate::error::ShadowError;

pub(super) fn preview(
    path: &Path,
    bounds: ShadowBounds,
    density: f64,
) -> Result<BitmapShadow, ShadowError> {
    let (src_width, src_height) = probe_dimensions(path)?;
    if src_width == 0 || src_height == 0 {
        return Err(ShadowError::EmptyDimensions);
    }

    let spec = ShadowSpec::fit(src_width, src_height, bounds, density);
    let sample = sample_size(src_width, src_height, spec.width, spec.height);

    let image = decode(path)?;
    let image = if sample > 1 {
        // Cheap box reduction first so the resize filter runs over a small buffer
        image.thumbnail(
            (src_width / sample).max(spec.width),
            (src_height / sample).max(spec.height),
        )
    } else {
        image
    };

    Ok(scaled_bitmap(image, spec))
}

/// Read the image header only.
fn probe_dimensions(path: &Path) -> Result<(u32, u32), ShadowError> {
    ImageReader::open(path)
        .map_err(|e| ShadowError::Open(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| ShadowError::Probe(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ShadowError::Probe(e.to_string()))
}

fn decode(path: &Path) -> Result<DynamicImage, ShadowError> {
    ImageReader::open(path)
        .map_err(|e| ShadowError::Open(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| ShadowError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| ShadowError::Decode(e.to_string()))
}

/// Largest power-of-two reduction that keeps both edges at or above the target.
pub fn sample_size(src_width: u32, src_height: u32, target_width: u32, target_height: u32) -> u32 {
    let target_width = target_width.max(1);
    let target_height = target_height.max(1);
    let mut sample = 1u32;
    while sample < (1 << 16)
        && src_width / (sample * 2) >= target_width
        && src_height / (sample * 2) >= target_height
    {
        sample *= 2;
    }
    sample
}
