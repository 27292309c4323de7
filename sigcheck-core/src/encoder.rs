//! Image encoding for transport and display.
//!
//! Signature images travel to the scan service and the table service as
//! base64 strings, and are rendered back as data URIs.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::ImageFormat;
use tracing::{debug, instrument};

use crate::error::{Result, SigcheckError};

/// MIME type used when the payload format cannot be sniffed.
const FALLBACK_MIME: &str = "image/png";

/// A base64-encoded image plus the format detected from its magic bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    payload: String,
    format: Option<ImageFormat>,
}

impl EncodedImage {
    /// Encode raw image bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(SigcheckError::validation("Image is empty"));
        }
        Ok(Self {
            payload: BASE64.encode(bytes),
            format: image::guess_format(bytes).ok(),
        })
    }

    /// The base64 payload, as sent in request bodies.
    pub fn as_str(&self) -> &str {
        &self.payload
    }

    pub fn into_string(self) -> String {
        self.payload
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format
            .map(|f| f.to_mime_type())
            .unwrap_or(FALLBACK_MIME)
    }

    /// `data:<mime>;base64,<payload>` for direct rendering.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.payload)
    }
}

/// Read an image file and encode it. The file is only read.
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub async fn encode_file(path: impl AsRef<Path>) -> Result<EncodedImage> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| SigcheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let encoded = EncodedImage::from_bytes(&bytes).map_err(|_| {
        SigcheckError::validation(format!("Image file is empty: {}", path.display()))
    })?;
    debug!(
        bytes = bytes.len(),
        mime = encoded.mime_type(),
        "Encoded image"
    );
    Ok(encoded)
}

/// Decode a stored base64 payload, failing closed on malformed input.
pub fn decode(payload: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(payload.trim())
        .map_err(|e| SigcheckError::Parse(format!("Invalid base64 image payload: {e}")))
}

/// Build a data URI for a payload read back from the table service.
pub fn data_uri_for_stored(payload: &str) -> String {
    let mime = decode(payload)
        .ok()
        .and_then(|bytes| image::guess_format(&bytes).ok())
        .map(|f| f.to_mime_type())
        .unwrap_or(FALLBACK_MIME);
    format!("data:{mime};base64,{}", payload.trim())
}
