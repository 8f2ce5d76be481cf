//! Content type detection for binary payloads.

use std::fmt::Debug;

/// Content type used when a payload can not be classified.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Determines the MIME type of a payload from its bytes.
pub trait ContentClassifier: Send + Sync + Debug {
    /// Return the detected MIME type, or `None` when the content is not recognized.
    fn classify(&self, data: &[u8]) -> Option<String>;

    /// Return the detected MIME type or [`OCTET_STREAM`].
    fn classify_or_default(&self, data: &[u8]) -> String {
        self.classify(data).unwrap_or_else(|| OCTET_STREAM.to_string())
    }
}

/// Classifier that recognizes nothing, so every payload is sent as [`OCTET_STREAM`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OctetStreamClassifier;

impl ContentClassifier for OctetStreamClassifier {
    fn classify(&self, _data: &[u8]) -> Option<String> {
        None
    }
}

/// Magic number based classifier backed by the [infer] crate.
///
/// [infer]: https://crates.io/crates/infer
#[cfg(feature = "sniff")]
#[derive(Debug, Clone, Copy, Default)]
pub struct InferClassifier;

#[cfg(feature = "sniff")]
impl ContentClassifier for InferClassifier {
    fn classify(&self, data: &[u8]) -> Option<String> {
        infer::get(data).map(|kind| kind.mime_type().to_string())
    }
}

/// Return the classifier used when none is configured.
pub(crate) fn default_classifier() -> std::sync::Arc<dyn ContentClassifier> {
    #[cfg(feature = "sniff")]
    {
        std::sync::Arc::new(InferClassifier)
    }
    #[cfg(not(feature = "sniff"))]
    {
        std::sync::Arc::new(OctetStreamClassifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D];

    #[test]
    fn octet_stream_fallback() {
        assert_eq!(OctetStreamClassifier.classify(PNG_HEADER), None);
        assert_eq!(OctetStreamClassifier.classify_or_default(PNG_HEADER), OCTET_STREAM);
    }

    #[test]
    #[cfg(feature = "sniff")]
    fn infer_detects_png() {
        assert_eq!(InferClassifier.classify(PNG_HEADER).as_deref(), Some("image/png"));
    }

    #[test]
    #[cfg(feature = "sniff")]
    fn infer_unknown_content() {
        assert_eq!(InferClassifier.classify_or_default(b"just some text"), OCTET_STREAM);
    }
}
