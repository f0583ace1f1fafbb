use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageReader, RgbaImage};
use std::fmt;
use std::io::Cursor;
use thiserror::Error;
use uuid::Uuid;

/// Encoded quality used when rasterizing a camera frame.
pub const JPEG_QUALITY: f64 = 0.9;
pub const JPEG_MIME: &str = "image/jpeg";
const UNKNOWN_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Frame buffer of {actual} bytes does not match {width}x{height} RGBA")]
    FrameSize {
        width: u32,
        height: u32,
        actual: usize,
    },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One captured or uploaded image, consumed by a single analysis.
#[derive(Clone, PartialEq)]
pub struct ImagePayload {
    id: Uuid,
    bytes: Vec<u8>,
    mime_type: String,
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Wraps the contents of a user-selected file. File-type filtering is
    /// left to the picker; when the browser reports no type the format is
    /// sniffed from the leading bytes.
    pub fn from_file(bytes: Vec<u8>, declared_mime: &str) -> Self {
        let mime_type = if declared_mime.trim().is_empty() {
            image::guess_format(&bytes)
                .map(|format| format.to_mime_type())
                .unwrap_or(UNKNOWN_MIME)
                .to_string()
        } else {
            declared_mime.to_string()
        };
        Self::new(bytes, mime_type)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Pixel dimensions read from the encoded header.
    pub fn dimensions(&self) -> Result<(u32, u32), PayloadError> {
        let reader = ImageReader::new(Cursor::new(&self.bytes)).with_guessed_format()?;
        Ok(reader.into_dimensions()?)
    }
}

/// Encodes a raw RGBA frame as JPEG. `quality` is in `0.0..=1.0`, matching
/// the canvas encoder options.
pub fn encode_jpeg(
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    quality: f64,
) -> Result<ImagePayload, PayloadError> {
    let actual = rgba.len();
    let frame = RgbaImage::from_raw(width, height, rgba).ok_or(PayloadError::FrameSize {
        width,
        height,
        actual,
    })?;
    let rgb = image::DynamicImage::ImageRgba8(frame).to_rgb8();

    let quality = (quality.clamp(0.01, 1.0) * 100.0).round() as u8;
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality).encode(
        rgb.as_raw(),
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;

    Ok(ImagePayload::new(encoded, JPEG_MIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_keeps_dimensions() {
        let payload = encode_jpeg(vec![200u8; 64 * 48 * 4], 64, 48, JPEG_QUALITY).unwrap();
        assert_eq!(payload.mime_type(), "image/jpeg");
        assert_eq!(payload.dimensions().unwrap(), (64, 48));
        assert!(payload.bytes().starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_encode_jpeg_rejects_short_buffer() {
        let err = encode_jpeg(vec![0u8; 10], 4, 4, JPEG_QUALITY).unwrap_err();
        assert!(matches!(err, PayloadError::FrameSize { actual: 10, .. }));
    }

    #[test]
    fn test_from_file_sniffs_missing_type() {
        let jpeg = encode_jpeg(vec![0u8; 8 * 8 * 4], 8, 8, 0.5).unwrap();
        let payload = ImagePayload::from_file(jpeg.bytes().to_vec(), "");
        assert_eq!(payload.mime_type(), "image/jpeg");

        let declared = ImagePayload::from_file(vec![1, 2, 3], "image/heic");
        assert_eq!(declared.mime_type(), "image/heic");

        let unknown = ImagePayload::from_file(vec![1, 2, 3], "");
        assert_eq!(unknown.mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_data_url() {
        let payload = ImagePayload::new(b"hello".to_vec(), "image/png");
        assert_eq!(payload.to_base64(), "aGVsbG8=");
        assert_eq!(payload.to_data_url(), "data:image/png;base64,aGVsbG8=");
        assert_ne!(payload.id(), ImagePayload::new(Vec::new(), "image/png").id());
    }
}
