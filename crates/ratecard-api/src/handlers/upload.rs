//! Sheet upload handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, BackTo};
use crate::flash::{self, Flash, FlashLevel};
use crate::pages;
use crate::routes::upload_path;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    response::{Html, Redirect},
};
use ratecard_core::RatecardError;
use ratecard_ingest::{IngestPipeline, SheetKind};
use std::sync::Arc;

/// Upload form
pub async fn page(kind: SheetKind, Query(flash): Query<Flash>) -> Html<String> {
    pages::upload_page(kind, &flash)
}

/// First file part of the form: its name and contents
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), RatecardError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RatecardError::UnreadableFile(e.body_text()))?
    {
        let Some(file_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            break;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| RatecardError::UnreadableFile(e.body_text()))?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(RatecardError::UnreadableFile("no file provided".to_string()))
}

/// Replace the kind's table with the uploaded workbook
pub async fn submit(
    kind: SheetKind,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    state.increment_requests();
    let back = upload_path(kind);

    let (file_name, bytes) = read_file_field(&mut multipart).await.back_to(back)?;
    tracing::info!(%kind, file = %file_name, bytes = bytes.len(), "Upload received");

    let mut pipeline = IngestPipeline::new(state.store.clone())
        .with_marker_policy(state.config.ingest.blank_marker.clone());
    let report = pipeline.ingest(kind, &file_name, &bytes).await.back_to(back)?;

    Ok(flash::redirect(back, FlashLevel::Success, &report.to_string()))
}
