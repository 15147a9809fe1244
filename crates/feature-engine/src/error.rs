//! Feature Error Types

use thiserror::Error;

/// Errors during feature alignment and descriptor handling
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Prediction input incompatible with the model's declared schema
    #[error("Feature mismatch on '{feature}': {reason}")]
    FeatureMismatch { feature: String, reason: String },

    /// Descriptor is internally inconsistent
    #[error("Invalid deployment descriptor: {0}")]
    InvalidDescriptor(String),

    /// Descriptor could not be read or written
    #[error("Descriptor I/O error: {0}")]
    DescriptorIo(String),

    /// Encoded matrix has an unexpected shape
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

impl FeatureError {
    pub(crate) fn mismatch(feature: &str, reason: impl Into<String>) -> Self {
        FeatureError::FeatureMismatch {
            feature: feature.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for FeatureError {
    fn from(err: std::io::Error) -> Self {
        FeatureError::DescriptorIo(err.to_string())
    }
}

impl From<serde_json::Error> for FeatureError {
    fn from(err: serde_json::Error) -> Self {
        FeatureError::DescriptorIo(err.to_string())
    }
}
