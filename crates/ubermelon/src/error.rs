//! Error taxonomy for the UberMelon app.

use axum::http::StatusCode;

/// UberMelon application errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unknown melon: {0}")]
    UnknownMelon(String),

    #[error("duplicate melon id: {0}")]
    DuplicateMelon(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// HTTP status used when this error ends a request.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownMelon(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateMelon(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for UberMelon operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_melon_display() {
        let err = AppError::UnknownMelon("kiwi".to_string());
        assert!(err.to_string().contains("unknown melon"));
        assert!(err.to_string().contains("kiwi"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::UnknownMelon("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DuplicateMelon("cren".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
