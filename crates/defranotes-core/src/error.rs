//! Error types for DefraNotes

use thiserror::Error;

/// Main error type for DefraNotes operations
#[derive(Error, Debug)]
pub enum NotesError {
    /// Endpoint unreachable, connection refused, or non-success HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// Store reachable but the query/mutation was rejected, or an expected
    /// type is missing from the schema
    #[error("Remote schema error: {0}")]
    RemoteSchema(String),

    /// The native peer bridge call itself failed (bridge unreachable)
    #[error("Peer bridge error: {0}")]
    PeerBridge(String),

    /// User-facing input validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid operation for current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type alias using NotesError
pub type NotesResult<T> = Result<T, NotesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NotesError::Validation("peer identifier must not be empty".to_string());
        assert_eq!(
            format!("{}", err),
            "Validation error: peer identifier must not be empty"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let notes_err: NotesError = io_err.into();
        assert!(matches!(notes_err, NotesError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let notes_err: NotesError = parse_err.into();
        assert!(matches!(notes_err, NotesError::Serialization(_)));
    }
}
