//! API Response types
//!
//! Every HTTP endpoint answers with the same envelope:
//!
//! ```json
//! {
//!     "code": 0,
//!     "msg": "success",
//!     "data": { ... }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Unified API response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code (0 = success)
    pub code: ErrorCode,
    /// Human-readable message
    pub msg: String,
    /// Response data (omitted for errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            code: ErrorCode::Success,
            msg: ErrorCode::Success.message().to_string(),
            data: Some(data),
        }
    }

    /// Create an error response
    pub fn error(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    /// Create an error response with the code's default message
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            msg: code.message().to_string(),
            data: None,
        }
    }

    /// Whether the response signals success
    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_serializes_data() {
        let resp = ApiResponse::ok(vec![1, 2, 3]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn error_envelope_omits_data() {
        let resp = ApiResponse::<()>::from_code(ErrorCode::NoPermission);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 2001);
        assert!(json.get("data").is_none());
    }
}
