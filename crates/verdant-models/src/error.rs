use thiserror::Error;

/// Errors from registry loading and variant selection.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No registered variant supports every modality the task needs.
    #[error("No capable model variant for modalities [{required}]")]
    NoCapableVariant { required: String },

    /// Registry document could not be parsed or is inconsistent.
    #[error("Malformed model registry: {0}")]
    Malformed(String),
}
