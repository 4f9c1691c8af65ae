use serde::{Deserialize, Serialize};

/// JSON envelope returned by every API route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
    error_kind: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error_kind: None,
        }
    }

    /// A successful response that carries an explanation alongside the data.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error_kind: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error_kind: None,
        }
    }

    pub fn error_with_kind(kind: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error_kind: Some(kind.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.error_kind.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_kind_and_no_data() {
        let response = ApiResponse::<()>::error_with_kind("not_found", "Task not found");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "not_found");
        assert_eq!(json["message"], "Task not found");
        assert!(json["data"].is_null());
    }
}
