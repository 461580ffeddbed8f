use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Request rejected: {}", .message.as_deref().unwrap_or("bad request"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape the backend uses for rejections:
/// `{"status": "error", "message": "...", ...}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        // Cut on a char boundary; multibyte text must not panic the slice
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..cut],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            400..=499 => ApiError::Rejected {
                status: status.as_u16(),
                message: serde_json::from_str::<ErrorBody>(body)
                    .ok()
                    .and_then(|b| b.message),
            },
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// The human-readable message the backend attached to a rejection,
    /// if it attached one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// True when the backend refused the bearer token. This is the single
    /// signal protected-call sites use to fall back to the login flow.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_maps_to_unauthorized() {
        let err = ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn rejection_extracts_backend_message() {
        let body = r#"{"status": "error", "message": "Invalid credentials.", "errors": {}}"#;
        let err = ApiError::from_status(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.server_message(), Some("Invalid credentials."));
    }

    #[test]
    fn rejection_without_message_field() {
        let err = ApiError::from_status(reqwest::StatusCode::BAD_REQUEST, "<html>nope</html>");
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn truncation_survives_multibyte_text_at_the_cut() {
        // 3-byte char straddling the truncation point
        let mut body = "x".repeat(MAX_ERROR_BODY_LENGTH - 1);
        body.push('€');
        body.push_str(&"y".repeat(100));

        let err = ApiError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        let text = err.to_string();
        assert!(text.contains("truncated"));
        assert!(!text.contains('€'));
    }

    #[test]
    fn server_errors_truncate_long_bodies() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        let text = err.to_string();
        assert!(text.contains("truncated"));
        assert!(text.len() < 700);
    }
}
