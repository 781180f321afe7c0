//! One-line flash messages carried on redirects
//!
//! A message travels as `?level=...&message=...` on the `303` back to the
//! page it belongs to, which renders it once.
//!
//! Author: hephaex@gmail.com

use axum::response::Redirect;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Flash message read back from the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Flash {
    pub level: Option<String>,
    pub message: Option<String>,
}

impl Flash {
    pub fn is_error(&self) -> bool {
        self.level.as_deref() == Some(FlashLevel::Error.as_str())
    }
}

/// Target URL of a flash redirect
pub fn flash_url(path: &str, level: FlashLevel, message: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    let first_line = message.lines().next().unwrap_or_default();
    format!(
        "{path}{separator}level={}&message={}",
        level.as_str(),
        urlencoding::encode(first_line)
    )
}

/// `303 See Other` back to `path` with a message
pub fn redirect(path: &str, level: FlashLevel, message: &str) -> Redirect {
    Redirect::to(&flash_url(path, level, message))
}
