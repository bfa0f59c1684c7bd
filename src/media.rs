//! Photo preprocessing: downscale, flatten, and re-encode user photos
//! before they ride along on a model request.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Raster extensions the photo picker and preprocessor accept.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

/// A photo (or generated image) held as encoded bytes plus its mime type.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Render as a Gemini `inlineData` request part.
    pub fn to_part(&self) -> Value {
        json!({
            "inlineData": {
                "mimeType": self.mime,
                "data": BASE64.encode(&self.data),
            }
        })
    }

    /// Render as a `data:` URL for HTML export.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.data))
    }
}

/// Load a photo from disk and shrink it for upload: alpha flattened onto
/// white, longest edge capped at `target_edge` (never upscaled), re-encoded
/// as JPEG at `quality`. A file that reads but will not decode is sent
/// as-is with a mime guessed from its extension.
pub fn prepare_photo(path: &Path, target_edge: u32, quality: u8) -> Result<InlineImage> {
    let raw = fs::read(path)
        .with_context(|| format!("Could not read photo {}", path.display()))?;

    match image::load_from_memory(&raw) {
        Ok(decoded) => encode_for_upload(&decoded, target_edge, quality),
        Err(_) => Ok(InlineImage {
            mime: guess_image_mime(path).to_string(),
            data: raw,
        }),
    }
}

fn encode_for_upload(decoded: &DynamicImage, target_edge: u32, quality: u8) -> Result<InlineImage> {
    let rgba = decoded.to_rgba8();
    let flattened = flatten_onto_white(&rgba);

    let longest = flattened.width().max(flattened.height());
    let sized = if longest > target_edge {
        DynamicImage::ImageRgba8(flattened)
            .resize(target_edge, target_edge, FilterType::Triangle)
            .to_rgb8()
    } else {
        DynamicImage::ImageRgba8(flattened).to_rgb8()
    };

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(&sized)
        .map_err(|e| anyhow!("JPEG encoding failed: {}", e))?;

    Ok(InlineImage {
        mime: "image/jpeg".to_string(),
        data: bytes,
    })
}

// Transparent regions read as black once JPEG drops the alpha channel,
// so blend them onto white first.
fn flatten_onto_white(rgba: &RgbaImage) -> RgbaImage {
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    flattened
}

pub fn guess_image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" | "heif" => "image/heic",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}

/// Whether a path looks like a raster image the picker should list.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| {
            let lower = value.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Walk a directory for photos the picker can offer. Hidden directories
/// and anything deeper than a few levels are skipped so a home directory
/// does not take seconds to scan.
pub fn find_photos(root: &Path) -> Vec<PathBuf> {
    let mut photos: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(4)
        .into_iter()
        .filter_entry(|entry| !should_ignore(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_image_path(path))
        .collect();
    photos.sort();
    photos
}

fn should_ignore(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name == "node_modules" || name == "target")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn checker_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let on = (x + y) % 2 == 0;
            *pixel = if on {
                Rgba([200, 120, 40, 255])
            } else {
                Rgba([30, 60, 90, 255])
            };
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_downscales_longest_edge() {
        let img = checker_image(64, 32);
        let out = encode_for_upload(&img, 16, 80).unwrap();
        assert_eq!(out.mime, "image/jpeg");

        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn test_never_upscales() {
        let img = checker_image(20, 10);
        let out = encode_for_upload(&img, 512, 80).unwrap();
        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.width(), 20);
        assert_eq!(decoded.height(), 10);
    }

    #[test]
    fn test_transparency_flattens_to_white() {
        let mut img = RgbaImage::new(8, 8);
        for pixel in img.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
        let out = encode_for_upload(&DynamicImage::ImageRgba8(img), 512, 85).unwrap();
        let decoded = image::load_from_memory(&out.data).unwrap().to_rgb8();
        let sample = decoded.get_pixel(4, 4);
        // JPEG is lossy; near-white is close enough
        assert!(sample[0] > 240 && sample[1] > 240 && sample[2] > 240);
    }

    #[test]
    fn test_prepare_photo_missing_file() {
        let err = prepare_photo(Path::new("/nonexistent/photo.jpg"), 1024, 80).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/photo.jpg"));
    }

    #[test]
    fn test_undecodable_file_falls_back_to_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-really.png");
        std::fs::write(&path, b"plainly not an image").unwrap();

        let out = prepare_photo(&path, 1024, 80).unwrap();
        assert_eq!(out.mime, "image/png");
        assert_eq!(out.data, b"plainly not an image");
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(&PathBuf::from("bench/broken-chair.JPG")));
        assert!(is_image_path(&PathBuf::from("scrap.webp")));
        assert!(!is_image_path(&PathBuf::from("notes.txt")));
        assert!(!is_image_path(&PathBuf::from("Makefile")));
    }

    #[test]
    fn test_find_photos_skips_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chair.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join(".cache/thumb.png"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("pile")).unwrap();
        std::fs::write(dir.path().join("pile/scrap.png"), b"x").unwrap();

        let photos = find_photos(dir.path());
        assert_eq!(photos.len(), 2);
        assert!(photos.iter().all(|p| !p.to_string_lossy().contains(".cache")));
    }

    #[test]
    fn test_inline_image_parts() {
        let img = InlineImage {
            mime: "image/jpeg".to_string(),
            data: vec![1, 2, 3],
        };
        let part = img.to_part();
        assert_eq!(part["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(part["inlineData"]["data"], "AQID");
        assert_eq!(img.to_data_url(), "data:image/jpeg;base64,AQID");
    }
}
