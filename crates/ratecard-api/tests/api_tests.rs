//! API Integration Tests
//!
//! Note: Tests marked with #[ignore] require a real database connection.
//! To run them, set DATABASE_URL to a test database and run: cargo test -- --ignored
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use ratecard_api::{create_router, create_router_for_testing, state::AppState};
use ratecard_core::config::AppConfig;
use ratecard_core::{MemoryStore, RateStore, Table};
use ratecard_parser::{Cell, ExcelReader};
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "ratecard-test-boundary";

// =============================================================================
// Helpers
// =============================================================================

fn app_with_store() -> (Router, Arc<dyn RateStore>) {
    let store: Arc<dyn RateStore> = Arc::new(MemoryStore::new());
    let state = AppState::new(AppConfig::default(), store.clone());
    (create_router(Arc::new(state)), store)
}

/// xlsx with text cells; empty strings stay blank, numeric strings become numbers
fn workbook(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let (r, c) = (r as u32, c as u16);
            match value.parse::<f64>() {
                Ok(n) => sheet.write_number(r, c, n).unwrap(),
                Err(_) => sheet.write_string(r, c, *value).unwrap(),
            };
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn ratesheet() -> Vec<u8> {
    workbook(&[
        &[
            "TAP-OUT",
            "TADIG PLMN Code",
            "Currency",
            "Start date",
            "MOC Call Local Call Rate/Value",
            "MOC Call Local Call Charging interval",
        ],
        &["MYSCC", "MYSCC", "USD", "2025-07-01", "0.25", "60 seconds"],
        &["FRAF1", "FRAF1", "EUR", "2025-07-01", "0.05", "1 second"],
    ])
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart(uri: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Decoded redirect target
fn location(response: &Response<Body>) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let raw = response.headers()[header::LOCATION].to_str().unwrap();
    urlencoding::decode(raw).unwrap().into_owned()
}

async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn upload(app: &Router, uri: &str, file_name: &str, bytes: &[u8]) -> String {
    let response = app
        .clone()
        .oneshot(multipart(uri, file_name, bytes))
        .await
        .unwrap();
    location(&response)
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = create_router_for_testing();

    let response = app.oneshot(get("/ready")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["ready"], true);
    assert_eq!(json["tables"]["ratesheet_v2"], 0);
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_root_redirects_to_upload() {
    let app = create_router_for_testing();
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(location(&response), "/upload");
}

// =============================================================================
// Upload Tests
// =============================================================================

#[tokio::test]
async fn test_upload_pages_render() {
    let app = create_router_for_testing();
    for uri in ["/upload", "/upload-country", "/upload-template", "/upload-json"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let page = body_text(response).await;
        assert!(page.contains(r#"enctype="multipart/form-data""#), "{uri}");
    }
}

#[tokio::test]
async fn test_upload_ratesheet() {
    let (app, store) = app_with_store();

    let target = upload(&app, "/upload", "ratesheet.xlsx", &ratesheet()).await;

    assert_eq!(
        target,
        "/upload?level=success&message=Loaded 2 rows into ratesheet_v2 (horizontal headers)"
    );
    let rates = store.list_rates().await.unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].record.tap_out.as_deref(), Some("MYSCC"));
    assert_eq!(rates[1].record.currency.as_deref(), Some("EUR"));
}

#[tokio::test]
async fn test_flash_message_is_rendered() {
    let app = create_router_for_testing();
    let response = app
        .oneshot(get("/upload?level=error&message=Missing%20required%20column%3A%20TAP-OUT"))
        .await
        .unwrap();
    let page = body_text(response).await;
    assert!(page.contains(r#"<p class="flash error">Missing required column: TAP-OUT</p>"#));
}

#[tokio::test]
async fn test_upload_missing_marker_keeps_table() {
    let (app, store) = app_with_store();
    upload(&app, "/upload", "ratesheet.xlsx", &ratesheet()).await;

    let bad = workbook(&[&["Operator", "Currency"], &["FRAF1", "EUR"]]);
    let target = upload(&app, "/upload", "ratesheet.xlsx", &bad).await;

    assert_eq!(
        target,
        "/upload?level=error&message=Missing required column: TAP-OUT"
    );
    assert_eq!(store.count(Table::Rates).await.unwrap(), 2);
}

#[tokio::test]
async fn test_upload_rejects_other_extensions() {
    let (app, store) = app_with_store();
    let target = upload(&app, "/upload", "ratesheet.csv", b"TAP-OUT\nFRAF1\n").await;

    assert!(target.starts_with("/upload?level=error&message=Invalid file:"));
    assert_eq!(store.count(Table::Rates).await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_without_file() {
    let app = create_router_for_testing();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload-template")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let target = location(&response);
    assert!(target.starts_with("/upload-template?level=error"));
    assert!(target.contains("no file provided"));
}

#[tokio::test]
async fn test_upload_json_bag() {
    let (app, store) = app_with_store();
    let target = upload(&app, "/upload-json", "ratesheet.xlsx", &ratesheet()).await;

    assert!(target.starts_with("/upload-json?level=success"));
    let bags = store.list_rate_bags().await.unwrap();
    assert_eq!(bags.len(), 2);
    let keys: Vec<&String> = bags[0].fields.keys().collect();
    assert_eq!(keys[0], "TAP-OUT");
    assert_eq!(keys[1], "TADIG PLMN Code");
}

// =============================================================================
// Download Tests
// =============================================================================

async fn seed_voice_tables(app: &Router) {
    upload(app, "/upload", "ratesheet.xlsx", &ratesheet()).await;
    upload(
        app,
        "/upload-country",
        "countries.xlsx",
        &workbook(&[
            &["name", "alpha-2", "alpha-3", "custom-name"],
            &["Malaysia", "my", "mys", "Malaysia"],
        ]),
    )
    .await;
    upload(
        app,
        "/upload-template",
        "template.xlsx",
        &workbook(&[
            &["Destination", "Area Code", "calls based on number types"],
            &["National", "60", ""],
        ]),
    )
    .await;
}

#[tokio::test]
async fn test_download_voice_ratecard() {
    let (app, _store) = app_with_store();
    seed_voice_tables(&app).await;

    let response = app
        .oneshot(get("/download-ratecard/file"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"ratecard_national.xlsx\""
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let grid = ExcelReader::new()
        .read_bytes("ratecard_national.xlsx", &body)
        .unwrap();

    assert_eq!(grid.height(), 2);
    assert_eq!(grid.cell(1, 0), &Cell::Text("National".to_string()));
    assert_eq!(grid.cell(1, 1), &Cell::Text("60".to_string()));
    assert_eq!(grid.cell(1, 2), &Cell::Float(0.25));
    assert_eq!(
        grid.cell(1, 3),
        &Cell::Text("CELC_IR_VOICE_TARIFF_MYSCC_20250701".to_string())
    );
    assert_eq!(grid.cell(1, 5), &Cell::Text("60/60".to_string()));
}

#[tokio::test]
async fn test_download_data_ratecards() {
    let (app, _store) = app_with_store();
    upload(&app, "/upload", "ratesheet.xlsx", &ratesheet()).await;

    for (uri, file_name) in [
        ("/download-gprs-ratecard/file", "gprs_ratecard.xlsx"),
        ("/download-sms-ratecard/file", "sms_ratecard.xlsx"),
        ("/download-volte-ratecard/file", "volte_ratecard.xlsx"),
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"{file_name}\"").as_str()
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let grid = ExcelReader::new().read_bytes(file_name, &body).unwrap();
        assert_eq!(grid.height(), 3, "{uri}");
        assert_eq!(grid.cell(1, 0), &Cell::Text("MYSCC".to_string()));
    }
}

#[tokio::test]
async fn test_download_pages_link_files() {
    let app = create_router_for_testing();
    let response = app.oneshot(get("/download-sms-ratecard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains(r#"href="/download-sms-ratecard/file""#));
}

// =============================================================================
// Record Edit Tests
// =============================================================================

#[tokio::test]
async fn test_data_lists_records() {
    let (app, _store) = app_with_store();
    upload(&app, "/upload", "ratesheet.xlsx", &ratesheet()).await;

    let response = app.clone().oneshot(get("/data")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains(r#"<a href="/data?id=2">2</a>"#));
    assert!(page.contains("FRAF1"));

    let response = app.oneshot(get("/data?id=1")).await.unwrap();
    let page = body_text(response).await;
    assert!(page.contains("<h2>Record 1</h2>"));
    assert!(page.contains(r#"name="column" value="currency""#));
}

#[tokio::test]
async fn test_data_edit_field() {
    let (app, store) = app_with_store();
    upload(&app, "/upload", "ratesheet.xlsx", &ratesheet()).await;

    let response = app
        .clone()
        .oneshot(form("/data", "id=2&column=end_date&value=31-Dec-2025"))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        "/data?id=2&level=success&message=Record 2 updated: end_date"
    );
    let rate = store.get_rate(2).await.unwrap().unwrap();
    assert_eq!(rate.record.end_date.unwrap().to_string(), "2025-12-31");
}

#[tokio::test]
async fn test_data_edit_rejects_bad_value() {
    let (app, store) = app_with_store();
    upload(&app, "/upload", "ratesheet.xlsx", &ratesheet()).await;

    let response = app
        .oneshot(form("/data", "id=1&column=start_date&value=someday"))
        .await
        .unwrap();

    assert!(location(&response).starts_with("/data?id=1&level=error&message=Constraint violation"));
    let rate = store.get_rate(1).await.unwrap().unwrap();
    assert_eq!(rate.record.start_date.unwrap().to_string(), "2025-07-01");
}

#[tokio::test]
async fn test_data_missing_record() {
    let app = create_router_for_testing();

    let response = app.clone().oneshot(get("/data?id=9")).await.unwrap();
    assert_eq!(
        location(&response),
        "/data?level=error&message=Record not found: ratesheet record 9"
    );

    let response = app
        .oneshot(form("/data", "id=9&column=currency&value=EUR"))
        .await
        .unwrap();
    assert!(location(&response).starts_with("/data?level=error"));
}

#[tokio::test]
async fn test_data_non_numeric_id() {
    let app = create_router_for_testing();

    let response = app.clone().oneshot(get("/data?id=abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/data?level=error&message=Record not found: ratesheet record abc"
    );

    let response = app
        .clone()
        .oneshot(form("/data", "id=x1&column=currency&value=EUR"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/data?level=error"));

    let response = app
        .oneshot(form("/data", "column=currency&value=EUR"))
        .await
        .unwrap();
    assert!(location(&response).starts_with("/data?level=error"));
}

#[tokio::test]
async fn test_data_empty_id_lists_records() {
    let app = create_router_for_testing();
    let response = app.oneshot(get("/data?id=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// PostgreSQL
// =============================================================================

#[tokio::test]
#[ignore = "requires database"]
async fn test_upload_and_download_against_postgres() {
    let config = AppConfig::from_env().unwrap();
    let store = ratecard_core::store::open(&config.database).await.unwrap();
    let app = create_router(Arc::new(AppState::new(config, store.clone())));

    let target = upload(&app, "/upload", "ratesheet.xlsx", &ratesheet()).await;
    assert!(target.starts_with("/upload?level=success"));
    assert_eq!(store.count(Table::Rates).await.unwrap(), 2);

    let response = app
        .oneshot(get("/download-gprs-ratecard/file"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
