use image::{imageops, ImageFormat, Rgba, RgbaImage};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

use crate::config::ShadowBounds;
use crate::error::ShadowError;
use crate::media::MediaKind;

mod images;
mod video;

pub use images::sample_size;
pub use video::install_ffmpeg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TouchPoint {
    pub x: u32,
    pub y: u32,
}

/// Size and anchor of a drag shadow, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowSpec {
    pub width: u32,
    pub height: u32,
    pub touch_point: TouchPoint,
}

impl ShadowSpec {
    /// Scale `src_width x src_height` so the short edge lands on the minimum
    /// bound, unless that pushes the long edge past the maximum, in which case
    /// the long edge lands on the maximum instead. Aspect ratio is preserved.
    pub fn fit(src_width: u32, src_height: u32, bounds: ShadowBounds, density: f64) -> Self {
        let (min_px, max_px) = bounds.to_px(density);
        if src_width == 0 || src_height == 0 {
            return Self::fallback(bounds, density);
        }

        let short = src_width.min(src_height) as f64;
        let long = src_width.max(src_height) as f64;

        let mut scale = min_px / short;
        if long * scale > max_px {
            scale = max_px / long;
        }

        let width = ((src_width as f64 * scale).round() as u32).max(1);
        let height = ((src_height as f64 * scale).round() as u32).max(1);
        Self::centered(width, height)
    }

    /// Square of the minimum edge, used when the media has no usable size.
    pub fn fallback(bounds: ShadowBounds, density: f64) -> Self {
        let (min_px, _) = bounds.to_px(density);
        let edge = (min_px.round() as u32).max(1);
        Self::centered(edge, edge)
    }

    fn centered(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            touch_point: TouchPoint {
                x: width / 2,
                y: height / 2,
            },
        }
    }
}

/// What the platform asks of a drag shadow while the gesture runs.
pub trait ShadowRenderer: Send + Sync {
    /// Shadow size and the point under the pointer.
    fn provide_metrics(&self) -> ShadowSpec;

    /// Paint the shadow into `surface`, which is at least as large as the metrics.
    fn draw(&self, surface: &mut RgbaImage);
}

/// Shadow backed by a pre-scaled preview of the media.
pub struct BitmapShadow {
    spec: ShadowSpec,
    bitmap: RgbaImage,
}

impl BitmapShadow {
    pub fn new(spec: ShadowSpec, bitmap: RgbaImage) -> Self {
        Self { spec, bitmap }
    }
}

impl ShadowRenderer for BitmapShadow {
    fn provide_metrics(&self) -> ShadowSpec {
        self.spec
    }

    fn draw(&self, surface: &mut RgbaImage) {
        imageops::overlay(surface, &self.bitmap, 0, 0);
    }
}

/// Generic placeholder used when the media could not be decoded.
pub struct DefaultShadow {
    spec: ShadowSpec,
}

impl DefaultShadow {
    const FILL: Rgba<u8> = Rgba([128, 128, 128, 160]);
    const BORDER: Rgba<u8> = Rgba([64, 64, 64, 220]);
    const BORDER_PX: u32 = 2;

    pub fn new(spec: ShadowSpec) -> Self {
        Self { spec }
    }
}

impl ShadowRenderer for DefaultShadow {
    fn provide_metrics(&self) -> ShadowSpec {
        self.spec
    }

    fn draw(&self, surface: &mut RgbaImage) {
        let width = self.spec.width.min(surface.width());
        let height = self.spec.height.min(surface.height());
        for y in 0..height {
            for x in 0..width {
                let edge = x < Self::BORDER_PX
                    || y < Self::BORDER_PX
                    || x + Self::BORDER_PX >= width
                    || y + Self::BORDER_PX >= height;
                surface.put_pixel(x, y, if edge { Self::BORDER } else { Self::FILL });
            }
        }
    }
}

/// Result of building a shadow. `degraded` carries the decode failure when the
/// default shadow had to stand in for the real preview.
pub struct BuiltShadow {
    pub renderer: Box<dyn ShadowRenderer>,
    pub degraded: Option<ShadowError>,
}

impl BuiltShadow {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Build the drag shadow for `path`. Never fails: decode problems fall back to
/// [`DefaultShadow`] and are reported through [`BuiltShadow::degraded`].
pub fn build(path: &Path, kind: MediaKind, bounds: ShadowBounds, density: f64) -> BuiltShadow {
    let preview = match kind {
        MediaKind::Image => images::preview(path, bounds, density),
        MediaKind::Video => video::preview(path, bounds, density),
    };

    match preview {
        Ok(shadow) => BuiltShadow {
            renderer: Box::new(shadow),
            degraded: None,
        },
        Err(err) => {
            log::warn!(
                "Falling back to default drag shadow for {}: {}",
                path.display(),
                err
            );
            BuiltShadow {
                renderer: Box::new(DefaultShadow::new(ShadowSpec::fallback(bounds, density))),
                degraded: Some(err),
            }
        }
    }
}

/// Resize a decoded preview to exactly `spec` and wrap it as a renderer.
fn scaled_bitmap(image: image::DynamicImage, spec: ShadowSpec) -> BitmapShadow {
    let bitmap = image
        .resize_exact(spec.width, spec.height, imageops::FilterType::Triangle)
        .to_rgba8();
    BitmapShadow::new(spec, bitmap)
}

/// Render a shadow to PNG bytes at its reported size.
pub fn render_png(renderer: &dyn ShadowRenderer) -> Result<Vec<u8>, ShadowError> {
    let spec = renderer.provide_metrics();
    let mut surface = RgbaImage::new(spec.width, spec.height);
    renderer.draw(&mut surface);

    let mut buffer = Vec::new();
    surface
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ShadowError::Encode(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn bounds(min: f64, max: f64) -> ShadowBounds {
        ShadowBounds::new(min, max).unwrap()
    }

    #[test]
    fn portrait_image_maps_short_edge_to_minimum() {
        let spec = ShadowSpec::fit(200, 400, bounds(50.0, 120.0), 2.0);
        assert_eq!(spec.width, 100);
        assert_eq!(spec.height, 200);
        assert_eq!(spec.touch_point, TouchPoint { x: 50, y: 100 });
    }

    #[test]
    fn panorama_is_capped_by_maximum() {
        let spec = ShadowSpec::fit(4000, 500, bounds(100.0, 300.0), 1.0);
        assert_eq!(spec.width, 300);
        assert_eq!(spec.height, 38);
    }

    #[test]
    fn square_stays_square() {
        for edge in [1, 7, 199, 200, 4096] {
            let spec = ShadowSpec::fit(edge, edge, bounds(64.0, 256.0), 1.5);
            assert_eq!(spec.width, spec.height, "edge {edge}");
            assert_eq!(spec.width, 96);
        }
    }

    #[test]
    fn longest_edge_within_bounds_and_ratio_kept() {
        let b = bounds(48.0, 160.0);
        let density = 2.0;
        let (min_px, max_px) = b.to_px(density);
        for w in [1u32, 3, 17, 100, 640, 1080, 1920, 5000] {
            for h in [1u32, 2, 33, 100, 480, 1920, 7000] {
                let spec = ShadowSpec::fit(w, h, b, density);
                let longest = spec.width.max(spec.height) as f64;
                assert!(
                    longest >= min_px.floor() && longest <= max_px.ceil(),
                    "{w}x{h} -> {}x{}",
                    spec.width,
                    spec.height
                );

                // Short edge follows the long edge to within a pixel
                let (short, expected) = if w >= h {
                    (spec.height, spec.width as f64 * h as f64 / w as f64)
                } else {
                    (spec.width, spec.height as f64 * w as f64 / h as f64)
                };
                if short > 1 {
                    assert!(
                        (expected - short as f64).abs() <= 1.0,
                        "{w}x{h} -> {}x{}",
                        spec.width,
                        spec.height
                    );
                }
            }
        }
    }

    #[test]
    fn zero_dimensions_use_fallback_square() {
        let spec = ShadowSpec::fit(0, 300, bounds(50.0, 120.0), 2.0);
        assert_eq!(spec, ShadowSpec::fallback(bounds(50.0, 120.0), 2.0));
        assert_eq!((spec.width, spec.height), (100, 100));
    }

    #[test]
    fn image_shadow_is_scaled_preview() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbaImage::from_pixel(200, 400, Rgba([10, 200, 30, 255]))
            .save(&path)
            .unwrap();

        let built = build(&path, MediaKind::Image, bounds(50.0, 120.0), 2.0);
        assert!(!built.is_degraded());
        let spec = built.renderer.provide_metrics();
        assert_eq!((spec.width, spec.height), (100, 200));

        let png = render_png(built.renderer.as_ref()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (100, 200));
        assert_eq!(decoded.get_pixel(50, 100), &Rgba([10, 200, 30, 255]));
    }

    #[test]
    fn undecodable_image_degrades_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let built = build(&path, MediaKind::Image, bounds(50.0, 120.0), 2.0);
        assert!(built.is_degraded());
        let spec = built.renderer.provide_metrics();
        assert_eq!((spec.width, spec.height), (100, 100));
        assert_eq!(spec.touch_point, TouchPoint { x: 50, y: 50 });
    }

    #[test]
    fn video_before_ffmpeg_install_drags_with_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.webm");
        std::fs::write(&path, b"webm bytes").unwrap();

        let built = build(&path, MediaKind::Video, bounds(50.0, 120.0), 1.0);
        assert!(matches!(built.degraded, Some(ShadowError::VideoFrame(_))));
        let spec = built.renderer.provide_metrics();
        assert_eq!((spec.width, spec.height), (50, 50));
    }

    #[test]
    fn default_shadow_paints_border_and_fill() {
        let shadow = DefaultShadow::new(ShadowSpec::fallback(bounds(10.0, 20.0), 1.0));
        let mut surface = RgbaImage::new(10, 10);
        shadow.draw(&mut surface);
        assert_eq!(surface.get_pixel(0, 0), &DefaultShadow::BORDER);
        assert_eq!(surface.get_pixel(5, 5), &DefaultShadow::FILL);
    }
}
