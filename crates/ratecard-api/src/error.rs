//! API error handling
//!
//! Every failure is reported to the user as a one-line flash message on a
//! redirect back to the page the request came from.
//!
//! Author: hephaex@gmail.com

use axum::response::{IntoResponse, Response};
use ratecard_core::RatecardError;

use crate::flash::{self, FlashLevel};

/// Application error type
#[derive(Debug)]
pub struct AppError {
    /// Page to send the user back to
    pub back_to: String,
    pub error: RatecardError,
}

impl AppError {
    pub fn new(back_to: impl Into<String>, error: impl Into<RatecardError>) -> Self {
        Self {
            back_to: back_to.into(),
            error: error.into(),
        }
    }

    /// Message shown to the user
    pub fn message(&self) -> String {
        match &self.error {
            RatecardError::UnreadableFile(detail) => {
                format!("Invalid file: {detail}. Please upload an Excel file (.xls or .xlsx).")
            }
            RatecardError::InsertionFailed { .. } => {
                format!("{}. Nothing was changed.", self.error)
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self.error {
            RatecardError::DatabaseError(_) | RatecardError::Other(_) => {
                tracing::error!(error = %self.error, back_to = %self.back_to, "Request failed");
            }
            _ => {
                tracing::warn!(error = %self.error, back_to = %self.back_to, "Request rejected");
            }
        }

        flash::redirect(&self.back_to, FlashLevel::Error, &self.message()).into_response()
    }
}

/// Attach the page to return to onto a fallible result
pub trait BackTo<T> {
    fn back_to(self, path: &str) -> Result<T, AppError>;
}

impl<T, E: Into<RatecardError>> BackTo<T> for Result<T, E> {
    fn back_to(self, path: &str) -> Result<T, AppError> {
        self.map_err(|e| AppError::new(path, e))
    }
}
