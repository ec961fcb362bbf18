//! Typed error hierarchy for the lead pipeline.
//!
//! `StoreError` is the only error that crosses the `LeadStore` seam. Internal
//! plumbing (SQLite access, config loading) stays on `anyhow::Result` and is
//! folded into `StoreError::Persistence` at the store boundary.

use thiserror::Error;

/// Errors surfaced by a `LeadStore` implementation and the board controller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad input: an undefined stage, a blank required field, an unknown enum value.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Lead {id} not found")]
    NotFound { id: String },

    /// Storage or network failure. Local state must not be changed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line.
        Self::Persistence(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_carries_field() {
        let err = StoreError::validation("stage", "unknown stage 'archivado'");
        match &err {
            StoreError::Validation { field, message } => {
                assert_eq!(field, "stage");
                assert!(message.contains("archivado"));
            }
            _ => panic!("Expected Validation"),
        }
        assert_eq!(err.to_string(), "Invalid stage: unknown stage 'archivado'");
    }

    #[test]
    fn not_found_carries_id() {
        let err = StoreError::not_found("abc-123");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("abc-123"));
    }

    #[test]
    fn anyhow_converts_to_persistence_with_context_chain() {
        let inner = anyhow::anyhow!("disk I/O error");
        let err: StoreError = inner.context("Failed to update lead").into();
        match &err {
            StoreError::Persistence(msg) => {
                assert!(msg.contains("Failed to update lead"));
                assert!(msg.contains("disk I/O error"));
            }
            _ => panic!("Expected Persistence"),
        }
    }

    #[test]
    fn store_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&StoreError::Persistence("x".into()));
    }
}
