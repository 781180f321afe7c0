//! Manual record edit handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, BackTo};
use crate::flash::{self, Flash, FlashLevel};
use crate::pages;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    Form,
};
use ratecard_core::RatecardError;
use ratecard_ingest::{rate_fields, update_rate_field};
use serde::Deserialize;
use std::sync::Arc;

/// Ids arrive as text so a malformed one becomes a flash message
#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub id: Option<String>,
    pub level: Option<String>,
    pub message: Option<String>,
}

/// One field of one record
#[derive(Debug, Deserialize)]
pub struct EditForm {
    #[serde(default)]
    pub id: String,
    pub column: String,
    #[serde(default)]
    pub value: String,
}

fn record_id(raw: &str) -> Result<i64, RatecardError> {
    let raw = raw.trim();
    raw.parse()
        .map_err(|_| RatecardError::RecordNotFound(format!("ratesheet record {raw}")))
}

/// List the ratesheet, with the selected record's fields
pub async fn show(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DataQuery>,
) -> Result<Html<String>, AppError> {
    let rates = state.store.list_rates().await.back_to("/upload")?;

    let id = query.id.as_deref().filter(|raw| !raw.trim().is_empty());
    let selected = match id {
        Some(raw) => {
            let id = record_id(raw).back_to("/data")?;
            let rate = rates
                .iter()
                .find(|r| r.id == id)
                .ok_or_else(|| RatecardError::RecordNotFound(format!("ratesheet record {id}")))
                .back_to("/data")?;
            Some((id, rate_fields(&rate.record)))
        }
        None => None,
    };

    let flash = Flash {
        level: query.level,
        message: query.message,
    };
    Ok(pages::data_page(&rates, selected, &flash))
}

/// Store one edited field
pub async fn edit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<EditForm>,
) -> Result<Redirect, AppError> {
    state.increment_requests();

    let id = record_id(&form.id).back_to("/data")?;
    let back = format!("/data?id={id}");
    let stored = update_rate_field(&state.store, id, &form.column, &form.value)
        .await
        .map_err(|e| match e {
            RatecardError::RecordNotFound(_) => AppError::new("/data", e),
            other => AppError::new(back.clone(), other),
        })?;

    let message = format!("Record {} updated: {}", stored.id, form.column);
    Ok(flash::redirect(&back, FlashLevel::Success, &message))
}
