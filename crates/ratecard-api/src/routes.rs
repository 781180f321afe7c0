//! Route definitions
//!
//! Author: hephaex@gmail.com

use crate::flash::Flash;
use crate::handlers::{data, download, upload};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    routing::{get, MethodRouter},
    Router,
};
use ratecard_export::RatecardKind;
use ratecard_ingest::SheetKind;
use std::sync::Arc;

/// Page that uploads a sheet kind
pub fn upload_path(kind: SheetKind) -> &'static str {
    match kind {
        SheetKind::Rates => "/upload",
        SheetKind::Countries => "/upload-country",
        SheetKind::Templates => "/upload-template",
        SheetKind::RatesJson => "/upload-json",
    }
}

/// Page that offers a ratecard; the file itself is under `<path>/file`
pub fn download_path(kind: RatecardKind) -> &'static str {
    match kind {
        RatecardKind::Voice => "/download-ratecard",
        RatecardKind::Gprs => "/download-gprs-ratecard",
        RatecardKind::Sms => "/download-sms-ratecard",
        RatecardKind::Volte => "/download-volte-ratecard",
    }
}

fn upload_route(kind: SheetKind) -> MethodRouter<Arc<AppState>> {
    get(move |flash: Query<Flash>| upload::page(kind, flash)).post(
        move |state: State<Arc<AppState>>, multipart: Multipart| {
            upload::submit(kind, state, multipart)
        },
    )
}

fn download_routes(kind: RatecardKind) -> Router<Arc<AppState>> {
    let path = download_path(kind);
    Router::new()
        .route(
            path,
            get(move |flash: Query<Flash>| download::page(kind, flash)),
        )
        .route(
            &format!("{path}/file"),
            get(move |state: State<Arc<AppState>>| download::file(kind, state)),
        )
}

/// Upload, download and record edit routes
pub fn ratesheet_routes() -> Router<Arc<AppState>> {
    let uploads = [
        SheetKind::Rates,
        SheetKind::Countries,
        SheetKind::Templates,
        SheetKind::RatesJson,
    ]
    .into_iter()
    .fold(Router::new(), |router, kind| {
        router.route(upload_path(kind), upload_route(kind))
    });

    let downloads = RatecardKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| router.merge(download_routes(kind)));

    Router::new()
        .merge(uploads)
        .merge(downloads)
        .route("/data", get(data::show).post(data::edit))
}
