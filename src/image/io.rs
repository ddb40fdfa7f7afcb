//! Decoding helpers built on the `image` crate.

use crate::image::ImageBuffer;
use crate::util::{ProdMatchError, ProdMatchResult};
use std::path::Path;

/// File extensions treated as candidate images when scanning a directory.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Creates an `ImageBuffer` from a decoded dynamic image, dropping alpha.
pub fn buffer_from_dynamic_image(img: &image::DynamicImage) -> ProdMatchResult<ImageBuffer> {
    let rgb = img.to_rgb8();
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    ImageBuffer::from_raw(rgb.into_raw(), width, height)
}

/// Decodes an encoded image (PNG or JPEG) held in memory.
///
/// `label` names the source in the error message.
pub fn decode_bytes(bytes: &[u8], label: &str) -> ProdMatchResult<ImageBuffer> {
    let img = image::load_from_memory(bytes).map_err(|err| ProdMatchError::ImageLoad {
        path: label.to_string(),
        reason: err.to_string(),
    })?;
    buffer_from_dynamic_image(&img).map_err(|err| ProdMatchError::ImageLoad {
        path: label.to_string(),
        reason: err.to_string(),
    })
}

/// Reads and decodes an image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> ProdMatchResult<ImageBuffer> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| ProdMatchError::ImageLoad {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    decode_bytes(&bytes, &path.display().to_string())
}

/// Encodes an `ImageBuffer` as PNG at `path`.
pub fn save_png<P: AsRef<Path>>(img: &ImageBuffer, path: P) -> ProdMatchResult<()> {
    let path = path.as_ref();
    let rgb = image::RgbImage::from_raw(
        img.width() as u32,
        img.height() as u32,
        img.as_raw().to_vec(),
    )
    .ok_or(ProdMatchError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    rgb.save_with_format(path, image::ImageFormat::Png)
        .map_err(|err| ProdMatchError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
}

/// Returns `true` when `path` carries one of the supported image extensions.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{decode_bytes, has_image_extension};
    use crate::util::ProdMatchError;
    use std::path::Path;

    #[test]
    fn garbage_bytes_fail_with_image_load() {
        let err = decode_bytes(b"not an image", "garbage.png").unwrap_err();
        assert!(matches!(err, ProdMatchError::ImageLoad { ref path, .. } if path == "garbage.png"));
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(has_image_extension(Path::new("a/b.PNG")));
        assert!(has_image_extension(Path::new("c.jpeg")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("noext")));
    }
}
