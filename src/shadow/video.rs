use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::download::{download_ffmpeg_package, ffmpeg_download_url, unpack_ffmpeg};
use image::GenericImageView;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

use super::{scaled_bitmap, BitmapShadow, ShadowSpec};
use crate::config::ShadowBounds;
use crate::error::ShadowError;

/// Frames ffmpeg's `thumbnail` filter inspects when picking a representative one.
const ANALYSIS_BATCH: u32 = 120;
const MIN_SCALE: u32 = 160;
const MAX_SCALE: u32 = 1920;

#[cfg(windows)]
const FFMPEG_BINARY: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const FFMPEG_BINARY: &str = "ffmpeg";

static FFMPEG: OnceCell<PathBuf> = OnceCell::new();

/// Locate ffmpeg in `dir`, downloading it there first if needed.
///
/// Blocks for the whole download. Video shadows fall back to the default
/// shadow until this has returned `Ok` once.
pub fn install_ffmpeg(dir: &Path) -> Result<&'static Path, ShadowError> {
    FFMPEG
        .get_or_try_init(|| locate_or_download(dir))
        .map(PathBuf::as_path)
}

fn installed_ffmpeg() -> Result<&'static Path, ShadowError> {
    FFMPEG
        .get()
        .map(PathBuf::as_path)
        .ok_or_else(|| ShadowError::VideoFrame("ffmpeg not ready".to_string()))
}

fn locate_or_download(dir: &Path) -> Result<PathBuf, ShadowError> {
    let binary = dir.join(FFMPEG_BINARY);
    if binary.is_file() {
        return Ok(binary);
    }

    let install_err = |e: String| ShadowError::VideoFrame(format!("ffmpeg install into {}: {e}", dir.display()));
    std::fs::create_dir_all(dir).map_err(|e| install_err(e.to_string()))?;

    log::info!("Downloading ffmpeg into {}", dir.display());
    ffmpeg_download_url()
        .and_then(|url| download_ffmpeg_package(url, dir))
        .and_then(|archive| unpack_ffmpeg(&archive, dir))
        .map_err(|e| install_err(format!("{e:#}")))?;

    if !binary.is_file() {
        return Err(install_err("archive had no ffmpeg binary".to_string()));
    }
    mark_executable(&binary).map_err(|e| install_err(e.to_string()))?;

    log::info!("ffmpeg ready at {}", binary.display());
    Ok(binary)
}

#[cfg(unix)]
fn mark_executable(binary: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(binary, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_binary: &Path) -> std::io::Result<()> {
    Ok(())
}

pub(super) fn preview(
    path: &Path,
    bounds: ShadowBounds,
    density: f64,
) -> Result<BitmapShadow, ShadowError> {
    if !path.is_file() {
        return Err(ShadowError::Open(format!("no video at {}", path.display())));
    }

    let ffmpeg = installed_ffmpeg()?;
    let (_, max_px) = bounds.to_px(density);
    let frame = image::load_from_memory(&representative_frame(ffmpeg, path, scale_width(max_px))?)
        .map_err(|e| ShadowError::VideoFrame(format!("undecodable frame: {e}")))?;

    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(ShadowError::EmptyDimensions);
    }

    Ok(scaled_bitmap(frame, ShadowSpec::fit(width, height, bounds, density)))
}

/// One PNG-encoded frame, picked by ffmpeg and no wider than `width`.
fn representative_frame(ffmpeg: &Path, video: &Path, width: u32) -> Result<Vec<u8>, ShadowError> {
    let output = FfmpegCommand::new_with_path(ffmpeg)
        .hide_banner()
        .args(["-loglevel", "error", "-nostdin"])
        .input(video)
        .filter(format!(
            "thumbnail={ANALYSIS_BATCH},scale='min({width},iw)':-1:force_original_aspect_ratio=decrease"
        ))
        .frames(1)
        .format("image2pipe")
        .codec_video("png")
        .pipe_stdout()
        .as_inner_mut()
        .output()
        .map_err(|e| ShadowError::VideoFrame(format!("ffmpeg did not run: {e}")))?;

    if !output.status.success() {
        return Err(ShadowError::VideoFrame(format!(
            "ffmpeg {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    if output.stdout.is_empty() {
        return Err(ShadowError::VideoFrame("ffmpeg produced no frame".to_string()));
    }
    Ok(output.stdout)
}

/// Frame width requested from ffmpeg: the shadow's maximum edge, clamped.
fn scale_width(max_px: f64) -> u32 {
    (max_px.ceil() as u32).clamp(MIN_SCALE, MAX_SCALE)
}
