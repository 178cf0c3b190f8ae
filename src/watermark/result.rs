//! Serializable outcome of a composition, as handed to completion callbacks.

use super::encoder::EncodedImage;
use super::error::{CompositionError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Result record delivered once per composition.
///
/// On success `encoded_image` holds the output as a data URI. On failure
/// `error_kind` and `message` are set, and `encoded_image` holds the partial
/// render when one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CompositionResult {
    pub fn success(image: &EncodedImage) -> Self {
        Self {
            success: true,
            encoded_image: Some(image.to_data_uri()),
            error_kind: None,
            message: None,
        }
    }

    pub fn failure(error: &CompositionError) -> Self {
        Self {
            success: false,
            encoded_image: error.partial().map(EncodedImage::to_data_uri),
            error_kind: Some(error.kind()),
            message: Some(error.message().to_string()),
        }
    }

    /// True when a failure still carries an image.
    pub fn has_partial(&self) -> bool {
        !self.success && self.encoded_image.is_some()
    }
}

impl From<Result<EncodedImage, CompositionError>> for CompositionResult {
    fn from(outcome: Result<EncodedImage, CompositionError>) -> Self {
        match outcome {
            Ok(image) => Self::success(&image),
            Err(error) => Self::failure(&error),
        }
    }
}
