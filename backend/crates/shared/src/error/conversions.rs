//! Error conversions into [`AppError`]

use super::app_error::AppError;

/// Identifiers arrive as path strings; a malformed one is the caller's
/// fault, never a lookup miss.
impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::bad_request("Malformed identifier").with_source(err)
    }
}

/// RFC 7807 problem body; the `action` hint rides along as an extension member
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "type": format!("https://httpstatuses.io/{}", self.status_code()),
            "title": self.kind().as_str(),
            "status": self.status_code(),
            "detail": self.message(),
            "action": self.action(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::kind::ErrorKind;
    use crate::id::AccountId;

    #[test]
    fn test_malformed_account_id_is_bad_request() {
        let err = "not-a-uuid".parse::<AccountId>().unwrap_err();
        let app_err: AppError = err.into();
        assert_eq!(app_err.kind(), ErrorKind::BadRequest);
        assert_eq!(app_err.message(), "Malformed identifier");
    }
}
