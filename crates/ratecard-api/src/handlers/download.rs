//! Ratecard download handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, BackTo};
use crate::flash::Flash;
use crate::pages;
use crate::routes::download_path;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use ratecard_export::{export, RatecardKind, XLSX_MIME};
use std::sync::Arc;

/// Download page
pub async fn page(kind: RatecardKind, Query(flash): Query<Flash>) -> Html<String> {
    pages::download_page(kind, &flash)
}

/// Generate the ratecard and send it as an attachment
pub async fn file(
    kind: RatecardKind,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    state.increment_requests();

    let file = export(state.store.as_ref(), kind, &state.config.ratecard)
        .await
        .back_to(download_path(kind))?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
