//! Web framework integration.

use serde::Serialize;

use crate::SessionError;

#[cfg(feature = "actix")]
pub mod actix;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<&SessionError> for ErrorResponse {
    fn from(err: &SessionError) -> Self {
        let code = match err {
            SessionError::InvalidSessionId => "INVALID_SESSION_ID",
            SessionError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            SessionError::StorageError(_) => "STORAGE_ERROR",
            SessionError::SerializationError(_) => "SERIALIZATION_ERROR",
        };

        ErrorResponse {
            error: err.to_string(),
            code: code.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let response = ErrorResponse::from(&SessionError::InvalidSessionId);
        assert_eq!(response.code, "INVALID_SESSION_ID");
        assert_eq!(response.error, "Invalid session identifier");

        let response = ErrorResponse::from(&SessionError::StorageError("disk full".to_owned()));
        assert_eq!(response.code, "STORAGE_ERROR");
        assert_eq!(response.error, "Storage error: disk full");
    }
}
