//! Error types for facture.

use thiserror::Error;

/// Result type alias using facture's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for facture operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(uuid::Uuid),

    /// Document could not be read or its template is unknown
    #[error("Document error: {0}")]
    Document(String),

    /// Line-item extraction failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Matching/categorization stage failed
    #[error("Matching error: {0}")]
    Matching(String),

    /// Event-source subscription failed
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("dictionary".to_string());
        assert_eq!(err.to_string(), "Not found: dictionary");
    }

    #[test]
    fn test_error_display_invoice_not_found() {
        let id = Uuid::nil();
        let err = Error::InvoiceNotFound(id);
        assert_eq!(err.to_string(), format!("Invoice not found: {}", id));
    }

    #[test]
    fn test_error_display_document() {
        let err = Error::Document("unknown template".to_string());
        assert_eq!(err.to_string(), "Document error: unknown template");
    }

    #[test]
    fn test_error_display_matching() {
        let err = Error::Matching("catalog lookup failed".to_string());
        assert_eq!(err.to_string(), "Matching error: catalog lookup failed");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
