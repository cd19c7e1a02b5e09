use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use santa_core::DrawError;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

pub const UNKNOWN_PARTICIPANT_MESSAGE: &str =
    "Error: no assignment for this person. Please contact the admin.";
pub const WRONG_PASSWORD_MESSAGE: &str = "Wrong password!";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{}", UNKNOWN_PARTICIPANT_MESSAGE)]
    UnknownParticipant,

    #[error("{}", WRONG_PASSWORD_MESSAGE)]
    WrongPassword,

    #[error("gift limit required")]
    MissingLimit,

    #[error("seed must be a whole number")]
    InvalidSeed,

    #[error("Failed to draw new pairs: {0}")]
    Draw(#[from] DrawError),

    #[error("Failed to save the assignment")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnknownParticipant => StatusCode::NOT_FOUND,
            AppError::WrongPassword => StatusCode::UNAUTHORIZED,
            AppError::MissingLimit | AppError::InvalidSeed => StatusCode::BAD_REQUEST,
            AppError::Draw(err) => {
                error!("draw failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Store(err) => {
                error!("store write failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
