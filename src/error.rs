// src/error.rs
//! Client error kinds and the network error message extractor

use serde_json::Value;
use thiserror::Error;

use crate::auth::Route;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Validation Error: {field}: {message}")]
    Validation { field: String, message: String },
    #[error("Network Error: {message}")]
    Network { status: Option<u16>, message: String },
    #[error("Resolution Error: {0}")]
    Resolution(String),
    #[error("Auth Error: {0}")]
    Auth(String),
    #[error("Storage Error: {0}")]
    Storage(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

// ==================== MESSAGE EXTRACTION ====================

/// Turns a failed response body into a readable message.
///
/// Probes, in order: a plain string body, `{message}`, `{error: {message}}`,
/// `{errors: {field: [...]}}`, `{error: "..."}`, and finally a generic text
/// chosen by status code.
pub fn extract_error_message(status: Option<u16>, body: &Value) -> String {
    probe_body(body).unwrap_or_else(|| status_message(status).to_string())
}

fn probe_body(body: &Value) -> Option<String> {
    if let Value::String(s) = body {
        return non_empty(s);
    }

    let obj = body.as_object()?;

    if let Some(msg) = obj.get("message").and_then(Value::as_str).and_then(non_empty) {
        return Some(msg);
    }

    if let Some(msg) = obj
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .and_then(non_empty)
    {
        return Some(msg);
    }

    if let Some((field, value)) = obj
        .get("errors")
        .and_then(Value::as_object)
        .and_then(|bag| bag.iter().next())
    {
        let first = match value {
            Value::Array(items) => items.first(),
            other => Some(other),
        };
        if let Some(text) = first.and_then(value_text) {
            return Some(format!("{}: {}", field, text));
        }
    }

    obj.get("error").and_then(Value::as_str).and_then(non_empty)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_empty(s),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn status_message(status: Option<u16>) -> &'static str {
    match status {
        Some(400) => "Validation failed (400). Please check fields.",
        Some(403) => "Forbidden (403). Your role cannot perform this action.",
        Some(500) => "Server error (500). Please try again.",
        _ => "Request failed",
    }
}

// ==================== CONSTRUCTORS ====================

impl ClientError {
    /// Classifies a non-success HTTP response.
    pub fn from_response(status: u16, body: &Value) -> Self {
        if status == 401 {
            return ClientError::session_expired();
        }
        ClientError::Network {
            status: Some(status),
            message: extract_error_message(Some(status), body),
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ClientError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ClientError::Network {
            status: None,
            message: message.into(),
        }
    }

    pub fn forbidden() -> Self {
        ClientError::Network {
            status: Some(403),
            message: status_message(Some(403)).to_string(),
        }
    }

    pub fn unrecognized_scan() -> Self {
        ClientError::Resolution("QR does not contain a valid Asset ID.".to_string())
    }

    pub fn unreadable_image() -> Self {
        ClientError::Resolution("Could not read QR from image.".to_string())
    }

    pub fn session_expired() -> Self {
        ClientError::Auth("Session expired. Please sign in again.".to_string())
    }

    pub fn not_logged_in() -> Self {
        ClientError::Auth("Not signed in.".to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Network { status, .. } => *status,
            ClientError::Auth(_) => Some(401),
            _ => None,
        }
    }

    /// Text for the transient notice shown at the UI boundary.
    pub fn notice(&self) -> String {
        match self {
            ClientError::Validation { field, message } => format!("{}: {}", field, message),
            ClientError::Network { message, .. } => message.clone(),
            ClientError::Resolution(msg) | ClientError::Auth(msg) | ClientError::Storage(msg) => {
                msg.clone()
            }
        }
    }

    /// Where the application must navigate after this error, if anywhere.
    pub fn redirect(&self) -> Option<Route> {
        match self {
            ClientError::Auth(_) => Some(Route::Login),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if status == Some(401) {
            return ClientError::session_expired();
        }
        let message = if err.is_timeout() {
            "Request timed out. Please try again.".to_string()
        } else if err.is_decode() {
            "Unexpected response from server.".to_string()
        } else {
            match status {
                Some(_) => status_message(status).to_string(),
                None => "Network unavailable. Please check your connection.".to_string(),
            }
        };
        ClientError::Network { status, message }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errs.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        match fields.first() {
            Some((field, list)) => {
                let message = list
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                ClientError::validation(field, message)
            }
            None => ClientError::validation("form", errs.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_body() {
        let body = json!("email already exists");
        assert_eq!(extract_error_message(Some(400), &body), "email already exists");
    }

    #[test]
    fn test_message_field_wins_over_nested() {
        let body = json!({"message": "top", "error": {"message": "nested"}});
        assert_eq!(extract_error_message(Some(400), &body), "top");
    }

    #[test]
    fn test_nested_error_message() {
        let body = json!({"error": {"message": "Asset not found"}});
        assert_eq!(extract_error_message(Some(404), &body), "Asset not found");
    }

    #[test]
    fn test_field_error_bag_uses_first_field_first_entry() {
        let body = json!({"errors": {"purchase_date": ["Not a valid date.", "Other"], "name": ["Missing"]}});
        assert_eq!(
            extract_error_message(Some(400), &body),
            "purchase_date: Not a valid date."
        );
    }

    #[test]
    fn test_field_error_bag_with_scalar_value() {
        let body = json!({"errors": {"role": "Invalid role"}});
        assert_eq!(extract_error_message(Some(400), &body), "role: Invalid role");
    }

    #[test]
    fn test_error_string_field() {
        let body = json!({"error": "invalid credentials"});
        assert_eq!(extract_error_message(Some(400), &body), "invalid credentials");
    }

    #[test]
    fn test_status_fallbacks() {
        let body = json!({});
        assert_eq!(
            extract_error_message(Some(400), &body),
            "Validation failed (400). Please check fields."
        );
        assert_eq!(
            extract_error_message(Some(403), &body),
            "Forbidden (403). Your role cannot perform this action."
        );
        assert_eq!(
            extract_error_message(Some(500), &Value::Null),
            "Server error (500). Please try again."
        );
        assert_eq!(extract_error_message(Some(418), &body), "Request failed");
        assert_eq!(extract_error_message(None, &json!("  ")), "Request failed");
    }

    #[test]
    fn test_unauthorized_response_is_auth_error() {
        let err = ClientError::from_response(401, &json!({"msg": "Token has expired"}));
        assert!(matches!(err, ClientError::Auth(_)));
        assert_eq!(err.redirect(), Some(Route::Login));
    }

    #[test]
    fn test_network_error_has_no_redirect() {
        let err = ClientError::from_response(500, &json!({"message": "boom"}));
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.notice(), "boom");
        assert_eq!(err.redirect(), None);
    }

    #[test]
    fn test_validation_notice() {
        let err = ClientError::validation("email", "is required");
        assert_eq!(err.notice(), "email: is required");
    }
}
