//! crates/storynest_core/src/media.rs
//!
//! The pure ingest step of the media pipeline: accept raw uploaded bytes,
//! enforce the type and size rules, and produce the self-describing inline
//! encoding forwarded to the asset host.

use crate::validate::ValidationError;
use base64::Engine;

/// Upload size ceiling (5 MB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// MIME types the pipeline accepts.
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// An uploaded image converted to its transport encoding: a base64 data URI
/// that embeds the MIME type, ready to be forwarded to the asset host.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data_uri: String,
    pub filename_hint: String,
}

impl EncodedImage {
    /// Splits the data URI back into its MIME type and raw bytes.
    ///
    /// Used by the local-mode asset store, which persists the original bytes
    /// instead of forwarding the inline encoding.
    pub fn decode(&self) -> Result<(String, Vec<u8>), ValidationError> {
        let rest = self
            .data_uri
            .strip_prefix("data:")
            .ok_or_else(|| ValidationError::new("Malformed image payload"))?;
        let (mime_type, encoded) = rest
            .split_once(";base64,")
            .ok_or_else(|| ValidationError::new("Malformed image payload"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| ValidationError::new("Malformed image payload"))?;
        Ok((mime_type.to_string(), bytes))
    }
}

/// Validates and encodes an uploaded image.
///
/// `declared_len` is the size the client claimed for the part (when known);
/// both it and the actual byte length are checked against the ceiling.
pub fn ingest(
    bytes: &[u8],
    mime_type: &str,
    filename_hint: &str,
    declared_len: Option<usize>,
) -> Result<EncodedImage, ValidationError> {
    if !ACCEPTED_IMAGE_TYPES.contains(&mime_type) {
        return Err(ValidationError::new(
            "Only JPEG, PNG, and GIF images are allowed",
        ));
    }
    if bytes.is_empty() {
        return Err(ValidationError::new("Uploaded image is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES || declared_len.is_some_and(|n| n > MAX_IMAGE_BYTES) {
        return Err(ValidationError::new("Image must be smaller than 5 MB"));
    }

    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(EncodedImage {
        data_uri: format!("data:{mime_type};base64,{encoded}"),
        filename_hint: filename_hint.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_three_image_types() {
        for mime in ACCEPTED_IMAGE_TYPES {
            assert!(ingest(b"fake-bytes", mime, "pic", None).is_ok());
        }
    }

    #[test]
    fn rejects_other_mime_types() {
        assert!(ingest(b"fake", "image/webp", "pic", None).is_err());
        assert!(ingest(b"fake", "application/pdf", "doc", None).is_err());
    }

    #[test]
    fn rejects_oversized_payloads() {
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(ingest(&big, "image/png", "big", None).is_err());
        // Declared size alone is enough to reject.
        assert!(ingest(b"tiny", "image/png", "lies", Some(MAX_IMAGE_BYTES + 1)).is_err());
        // At the boundary both pass.
        assert!(ingest(b"tiny", "image/png", "ok", Some(MAX_IMAGE_BYTES)).is_ok());
    }

    #[test]
    fn data_uri_embeds_the_mime_type() {
        let encoded = ingest(&[1, 2, 3], "image/jpeg", "photo.jpg", None).unwrap();
        assert!(encoded.data_uri.starts_with("data:image/jpeg;base64,"));
        assert_eq!(encoded.filename_hint, "photo.jpg");
    }

    #[test]
    fn decode_round_trips_the_payload() {
        let original = vec![7u8, 8, 9, 10];
        let encoded = ingest(&original, "image/gif", "anim.gif", None).unwrap();
        let (mime, bytes) = encoded.decode().unwrap();
        assert_eq!(mime, "image/gif");
        assert_eq!(bytes, original);
    }
}
