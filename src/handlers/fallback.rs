//! Envelope answers for requests no route handles.

use crate::error::AppError;

pub async fn not_found() -> AppError {
    AppError::NotFound("The requested resource does not exist".to_string())
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
