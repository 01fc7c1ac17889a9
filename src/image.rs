//! Image payloads submitted for processing.
//!
//! The core never looks inside the bytes; it only needs a reference for the
//! job record and a content-type hint for the upload.

use std::path::Path;

use crate::error::SnapvoiceError;
use crate::state_machine::ImageRef;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct ImageSource {
    reference: ImageRef,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(reference: ImageRef, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            reference,
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a whole image file, guessing the content type from its extension.
    pub async fn from_path(path: &Path) -> Result<Self, SnapvoiceError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SnapvoiceError::Image {
                path: path.display().to_string(),
                source,
            })?;
        if bytes.is_empty() {
            return Err(SnapvoiceError::EmptyImage(path.display().to_string()));
        }
        Ok(Self::new(
            ImageRef::new(path.display().to_string()),
            content_type_for(path),
            bytes,
        ))
    }

    pub fn reference(&self) -> &ImageRef {
        &self.reference
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
