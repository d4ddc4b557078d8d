use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tutor_pipeline::{ErrorResponse, TutorError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        let status = if err.is_rejected_input() {
            StatusCode::BAD_REQUEST
        } else if err.is_state_conflict() {
            StatusCode::CONFLICT
        } else {
            StatusCode::BAD_GATEWAY
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                status: "error".to_string(),
                error: self.message,
            }),
        )
            .into_response()
    }
}
