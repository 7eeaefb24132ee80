//! Error types for the urban-heat dashboard.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using HeatError.
pub type HeatResult<T> = Result<T, HeatError>;

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Primary error type for dashboard operations.
#[derive(Debug, Error)]
pub enum HeatError {
    // === Input Errors ===
    #[error("{}", join_messages(.0))]
    Validation(Vec<FieldError>),

    #[error("No boundary found for municipality: {0}")]
    BoundaryNotFound(String),

    #[error("Municipality not found in statistics service: {0}")]
    MunicipalityNotFound(String),

    #[error("No imagery available: {0}")]
    NoCoverage(String),

    #[error("Postal code not found: {0}")]
    PostalCodeNotFound(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    // === Upstream Errors ===
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{service} request failed{}: {message}", status_suffix(.status))]
    Upstream {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("No thumbnail URL returned for {layer}. The region may be too large or the processing may have failed.")]
    ThumbnailUnavailable { layer: String },

    #[error("Failed to fetch image data for {layer}. Status: {status}")]
    ThumbnailFetch { layer: String, status: u16 },

    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("Model output did not match the {flow} schema: {message}")]
    InvalidModelOutput { flow: String, message: String },

    // === Local Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

impl HeatError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        HeatError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn upstream(service: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        HeatError::Upstream {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            HeatError::Validation(_) => 400,

            HeatError::BoundaryNotFound(_)
            | HeatError::MunicipalityNotFound(_)
            | HeatError::NoCoverage(_)
            | HeatError::PostalCodeNotFound(_)
            | HeatError::NotFound { .. } => 404,

            HeatError::Authentication(_)
            | HeatError::Upstream { .. }
            | HeatError::ThumbnailUnavailable { .. }
            | HeatError::ThumbnailFetch { .. }
            | HeatError::InvalidImage(_)
            | HeatError::InvalidModelOutput { .. } => 502,

            _ => 500,
        }
    }

    /// True when the failure originated outside this process.
    pub fn is_upstream(&self) -> bool {
        self.http_status_code() == 502
    }
}

impl From<std::io::Error> for HeatError {
    fn from(err: std::io::Error) -> Self {
        HeatError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for HeatError {
    fn from(err: serde_json::Error) -> Self {
        HeatError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_fields() {
        let err = HeatError::Validation(vec![
            FieldError::new("municipalityName", "Municipality name is required."),
            FieldError::new("municipalityDescription", "Municipality description is required."),
        ]);
        assert_eq!(
            err.to_string(),
            "Municipality name is required., Municipality description is required."
        );
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = HeatError::upstream("IBGE", Some(503), "service unavailable");
        assert_eq!(err.to_string(), "IBGE request failed with status 503: service unavailable");
        assert!(err.is_upstream());

        let err = HeatError::upstream("Earth Engine", None, "connection reset");
        assert_eq!(err.to_string(), "Earth Engine request failed: connection reset");
    }

    #[test]
    fn test_thumbnail_fetch_names_layer() {
        let err = HeatError::ThumbnailFetch { layer: "LST".into(), status: 404 };
        assert!(err.to_string().contains("LST"));
        assert!(err.to_string().contains("404"));
    }
}
