//! Image encoding: screenshot file → base64 `ImageData`.
//!
//! Vision APIs accept images as base64 data embedded in the JSON request
//! body. Screenshots are already PNG on disk, so the bytes are sent as-is;
//! the MIME type is sniffed from the content rather than trusted from the
//! file extension. `detail: "high"` keeps small print legible for OCR.

use crate::error::ModelError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// Read an image file and wrap it for a vision request.
///
/// A missing, empty, or non-image file is the caller's mistake, not the
/// model's, so it surfaces as [`ModelError::InvalidInput`].
pub async fn encode_image_file(path: &Path) -> Result<ImageData, ModelError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ModelError::InvalidInput(format!("cannot read image '{}': {}", path.display(), e))
    })?;
    encode_image_bytes(&bytes).map_err(|detail| {
        ModelError::InvalidInput(format!("'{}': {}", path.display(), detail))
    })
}

/// Encode raw image bytes, detecting the format from the header.
pub fn encode_image_bytes(bytes: &[u8]) -> Result<ImageData, String> {
    if bytes.is_empty() {
        return Err("image file is empty".to_string());
    }
    let format = image::guess_format(bytes).map_err(|e| format!("unrecognised image: {e}"))?;
    let mime = format.to_mime_type();

    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());

    Ok(ImageData::new(b64, mime).with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn png_is_detected_and_encoded() {
        let bytes = png_bytes();
        let data = encode_image_bytes(&bytes).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&data.data).unwrap(), bytes);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(encode_image_bytes(b"not an image at all").is_err());
        assert!(encode_image_bytes(&[]).is_err());
    }

    #[test]
    fn missing_file_is_invalid_input() {
        let err = tokio_test::block_on(encode_image_file(Path::new("/nonexistent/page_0001.png")))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let data = encode_image_file(&path).await.unwrap();
        assert_eq!(data.mime_type, "image/png");
    }
}
