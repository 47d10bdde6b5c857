use actix_web::{HttpResponse, http::StatusCode};
use chrono::{Local, NaiveDate};
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            message: None,
            data: None,
            error: Some(message),
        }
    }
}

impl ApiResponse<()> {
    pub fn to_response(&self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(self)
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    ApiResponse::<()>::error(message.into()).to_response(status)
}

pub fn forbidden() -> HttpResponse {
    error_response(StatusCode::FORBIDDEN, "Access denied")
}

/// Club-local calendar date used for billing months and attendance windows.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_empty_fields() {
        let json = serde_json::to_value(ApiResponse::<()>::error("nope".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn success_envelope_carries_message() {
        let json =
            serde_json::to_value(ApiResponse::success_with_message(3, "done".to_string())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": true, "message": "done", "data": 3 })
        );
    }

    #[test]
    fn error_response_sets_status() {
        assert_eq!(
            error_response(StatusCode::CONFLICT, "busy").status(),
            StatusCode::CONFLICT
        );
    }
}
