#![allow(clippy::module_name_repetitions)]
//! File staging: optional raster re-encode, then `docker cp` into the
//! target container with candidate fallbacks and an optional `ls` check.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, GenericImageView, ImageEncoder};

use crate::docker;
use crate::environment::ORD_CONTAINER_CANDIDATES;
use crate::errors::StageError;
use crate::probe::env_override;
use crate::util::file_extension;

/// Files at or below this size are inscribed as-is (one-sat-per-byte
/// postage makes ~46 KiB the point where re-encoding starts to pay).
pub const DEFAULT_OPTIMIZE_THRESHOLD: u64 = 46 * 1024;

/// Width cap applied before re-encoding.
pub const MAX_WIDTH: u32 = 1920;

pub const DEFAULT_CONTAINER_DATA_DIR: &str = "/data";

pub fn optimize_threshold() -> u64 {
    env_override("ORDFORGE_OPTIMIZE_THRESHOLD")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_OPTIMIZE_THRESHOLD)
}

pub fn container_data_dir() -> String {
    env_override("ORD_CONTAINER_DATA_DIR").unwrap_or_else(|| DEFAULT_CONTAINER_DATA_DIR.to_string())
}

#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    /// Path to the bytes that will be staged (the original, or the .webp
    /// replacement when re-encoding shrank the file).
    pub path: PathBuf,
    pub optimized: bool,
    pub original_size: u64,
    pub final_size: u64,
}

impl OptimizeOutcome {
    fn unchanged(path: &Path, size: u64) -> Self {
        OptimizeOutcome {
            path: path.to_path_buf(),
            optimized: false,
            original_size: size,
            final_size: size,
        }
    }
}

/// Re-encode JPEG/PNG above the threshold to WebP (width-capped), keeping
/// the result only when it is strictly smaller. Decode or encode failure is
/// not an error: the original file is kept untouched.
pub fn optimize_image(path: &Path, threshold: u64) -> OptimizeOutcome {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let name = path.file_name().map(|n| n.to_string_lossy().to_string());
    let ext = name.as_deref().and_then(file_extension);
    let eligible = matches!(ext.as_deref(), Some("jpg") | Some("jpeg") | Some("png"));
    if !eligible || size <= threshold {
        return OptimizeOutcome::unchanged(path, size);
    }

    let Ok(bytes) = fs::read(path) else {
        return OptimizeOutcome::unchanged(path, size);
    };
    let Ok(decoded) = image::load_from_memory(&bytes) else {
        return OptimizeOutcome::unchanged(path, size);
    };

    let (w, _h) = decoded.dimensions();
    let resized = if w > MAX_WIDTH {
        decoded.resize(MAX_WIDTH, MAX_WIDTH, FilterType::Triangle)
    } else {
        decoded
    };

    let rgba = resized.to_rgba8();
    let mut encoded = Vec::new();
    let encoder = WebPEncoder::new_lossless(Cursor::new(&mut encoded));
    if encoder
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
        .is_err()
    {
        return OptimizeOutcome::unchanged(path, size);
    }

    if encoded.len() as u64 >= size {
        return OptimizeOutcome::unchanged(path, size);
    }

    // The derived .webp name may already be taken by an unrelated cached
    // file; suffix a short id instead of clobbering it.
    let mut webp_path = path.with_extension("webp");
    if webp_path.exists() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        webp_path = path.with_file_name(format!("{stem}-{}.webp", crate::create_request_id()));
    }
    if fs::write(&webp_path, &encoded).is_err() {
        return OptimizeOutcome::unchanged(path, size);
    }
    let _ = fs::remove_file(path);
    OptimizeOutcome {
        path: webp_path,
        optimized: true,
        original_size: size,
        final_size: encoded.len() as u64,
    }
}

#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Container the file actually landed in (may be an alternative).
    pub container: String,
    /// Absolute path of the file inside the container.
    pub container_path: String,
    pub verified: bool,
}

/// Candidate containers to retry a failed copy against.
pub fn alternative_containers(primary: &str) -> Vec<String> {
    ORD_CONTAINER_CANDIDATES
        .iter()
        .filter(|c| **c != primary)
        .map(|c| c.to_string())
        .collect()
}

/// Copy a staged file into the container, retrying once per alternative
/// candidate name, then optionally confirm the file is visible inside.
pub fn stage_file(
    primary: &str,
    alternatives: &[String],
    local: &Path,
    dest_dir: &str,
    verify: bool,
) -> Result<StageOutcome, StageError> {
    let file_name = local
        .file_name()
        .ok_or_else(|| {
            StageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "staged path has no file name",
            ))
        })?
        .to_string_lossy()
        .to_string();
    let container_path = format!("{}/{file_name}", dest_dir.trim_end_matches('/'));

    let mut last_detail = String::new();
    let mut targets: Vec<&str> = vec![primary];
    targets.extend(alternatives.iter().map(String::as_str).filter(|c| *c != primary));

    for target in targets {
        match docker::copy_into_container(target, local, dest_dir) {
            Ok(()) => {
                let verified = if verify {
                    docker::path_exists_in_container(target, &container_path)
                } else {
                    false
                };
                return Ok(StageOutcome {
                    container: target.to_string(),
                    container_path,
                    verified,
                });
            }
            Err(e) => {
                if last_detail.is_empty() {
                    last_detail = e.to_string();
                }
            }
        }
    }

    Err(StageError::Copy {
        container: primary.to_string(),
        detail: last_detail,
        container_running: docker::container_is_running(primary),
        running: docker::running_containers(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        // Noisy-ish gradient so the PNG is not trivially tiny
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8, 255])
        });
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_optimize_skips_small_files() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("small.png");
        fs::write(&p, png_bytes(16, 16)).unwrap();
        let out = optimize_image(&p, 1024 * 1024);
        assert!(!out.optimized);
        assert_eq!(out.path, p);
        assert!(p.exists());
    }

    #[test]
    fn test_optimize_never_grows_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("img.png");
        fs::write(&p, png_bytes(256, 256)).unwrap();
        let before = fs::metadata(&p).unwrap().len();
        let out = optimize_image(&p, 1);
        assert!(out.final_size <= before);
        if out.optimized {
            assert!(out.path.extension().unwrap() == "webp");
            assert!(out.final_size < out.original_size);
            assert!(!p.exists());
        } else {
            assert!(p.exists());
        }
    }

    #[test]
    fn test_optimize_is_idempotent_on_webp() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("img.png");
        fs::write(&p, png_bytes(256, 256)).unwrap();
        let first = optimize_image(&p, 1);
        let second = optimize_image(&first.path, 1);
        assert!(!second.optimized);
        assert_eq!(second.final_size, first.final_size);
    }

    #[test]
    fn test_optimize_never_clobbers_existing_webp() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("img.png");
        fs::write(&p, png_bytes(256, 256)).unwrap();
        let sentinel = tmp.path().join("img.webp");
        fs::write(&sentinel, b"unrelated cached file").unwrap();
        let out = optimize_image(&p, 1);
        assert_eq!(fs::read(&sentinel).unwrap(), b"unrelated cached file");
        if out.optimized {
            assert_ne!(out.path, sentinel);
        }
    }

    #[test]
    fn test_optimize_keeps_corrupt_file_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("broken.png");
        fs::write(&p, vec![0u8; 100_000]).unwrap();
        let out = optimize_image(&p, 1024);
        assert!(!out.optimized);
        assert_eq!(out.original_size, 100_000);
        assert!(p.exists());
    }

    #[test]
    fn test_alternative_containers_excludes_primary() {
        let alts = alternative_containers("ord");
        assert!(!alts.iter().any(|c| c == "ord"));
        assert!(alts.iter().any(|c| c == "ordinals_ord_1"));
    }
}
