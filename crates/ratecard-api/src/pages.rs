//! Server-rendered HTML pages
//!
//! Author: hephaex@gmail.com

use axum::response::Html;
use ratecard_core::StoredRate;
use ratecard_export::RatecardKind;
use ratecard_ingest::{FieldSpec, SheetKind};

use crate::flash::Flash;
use crate::routes::{download_path, upload_path};

/// Escape text for HTML bodies and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn nav() -> String {
    let uploads = [
        SheetKind::Rates,
        SheetKind::Countries,
        SheetKind::Templates,
        SheetKind::RatesJson,
    ]
    .iter()
    .map(|kind| format!(r#"<a href="{}">{}</a>"#, upload_path(*kind), upload_title(*kind)))
    .collect::<Vec<_>>()
    .join(" | ");

    let downloads = RatecardKind::ALL
        .iter()
        .map(|kind| format!(r#"<a href="{}">{}</a>"#, download_path(*kind), download_title(*kind)))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(r#"<nav>{uploads}<br>{downloads} | <a href="/data">Edit records</a></nav>"#)
}

fn flash_block(flash: &Flash) -> String {
    match &flash.message {
        Some(message) => {
            let class = if flash.is_error() { "error" } else { "success" };
            format!(r#"<p class="flash {class}">{}</p>"#, escape(message))
        }
        None => String::new(),
    }
}

fn layout(title: &str, flash: &Flash, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n{nav}\n<h1>{title}</h1>\n{flash}\n{body}\n</body>\n</html>\n",
        title = escape(title),
        nav = nav(),
        flash = flash_block(flash),
    ))
}

pub fn upload_title(kind: SheetKind) -> &'static str {
    match kind {
        SheetKind::Rates => "Upload ratesheet",
        SheetKind::Countries => "Upload countries",
        SheetKind::Templates => "Upload destination template",
        SheetKind::RatesJson => "Upload ratesheet (any columns)",
    }
}

pub fn download_title(kind: RatecardKind) -> &'static str {
    match kind {
        RatecardKind::Voice => "Voice ratecard",
        RatecardKind::Gprs => "GPRS ratecard",
        RatecardKind::Sms => "SMS ratecard",
        RatecardKind::Volte => "VoLTE ratecard",
    }
}

pub fn upload_page(kind: SheetKind, flash: &Flash) -> Html<String> {
    let body = format!(
        r#"<p>The sheet must have a <code>{marker}</code> header in its first row or first column. Uploading replaces the whole <code>{table}</code> table.</p>
<form method="post" action="{action}" enctype="multipart/form-data">
<input type="file" name="file" accept=".xls,.xlsx,.xlsm,.xlsb,.ods">
<button type="submit">Upload</button>
</form>"#,
        marker = escape(kind.marker()),
        table = kind.table(),
        action = upload_path(kind),
    );
    layout(upload_title(kind), flash, &body)
}

pub fn download_page(kind: RatecardKind, flash: &Flash) -> Html<String> {
    let body = format!(
        r#"<p><a href="{path}/file">Download {file}</a></p>"#,
        path = download_path(kind),
        file = kind.file_name(),
    );
    layout(download_title(kind), flash, &body)
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(escape).unwrap_or_default()
}

fn date(value: Option<chrono::NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Ratesheet listing, with the edit form of the selected record
pub fn data_page(
    rates: &[StoredRate],
    selected: Option<(i64, Vec<(&'static FieldSpec, String)>)>,
    flash: &Flash,
) -> Html<String> {
    let mut body = String::from(
        "<table>\n<tr><th>Id</th><th>TAP-OUT</th><th>TADIG PLMN Code</th>\
         <th>Start date</th><th>End date</th><th>Currency</th></tr>\n",
    );
    for rate in rates {
        let record = &rate.record;
        body.push_str(&format!(
            "<tr><td><a href=\"/data?id={id}\">{id}</a></td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td></tr>\n",
            text(&record.tap_out),
            text(&record.tadig_plmn_code),
            date(record.start_date),
            date(record.end_date),
            text(&record.currency),
            id = rate.id,
        ));
    }
    body.push_str("</table>\n");

    if let Some((id, fields)) = selected {
        body.push_str(&format!("<h2>Record {id}</h2>\n<table>\n"));
        for (spec, value) in fields {
            body.push_str(&format!(
                "<tr><td>{header}</td><td><form method=\"post\" action=\"/data\">\
                 <input type=\"hidden\" name=\"id\" value=\"{id}\">\
                 <input type=\"hidden\" name=\"column\" value=\"{column}\">\
                 <input name=\"value\" value=\"{value}\">\
                 <button type=\"submit\">Save</button></form></td></tr>\n",
                header = escape(spec.header),
                column = spec.column,
                value = escape(&value),
            ));
        }
        body.push_str("</table>\n");
    }

    layout("Ratesheet records", flash, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b>"AT&T"</b>"#), "&lt;b&gt;&quot;AT&amp;T&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_flash_is_escaped() {
        let flash = Flash {
            level: Some("error".to_string()),
            message: Some("<script>".to_string()),
        };
        let Html(page) = upload_page(SheetKind::Rates, &flash);
        assert!(page.contains(r#"<p class="flash error">&lt;script&gt;</p>"#));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn test_upload_page_names_marker() {
        let Html(page) = upload_page(SheetKind::Countries, &Flash::default());
        assert!(page.contains("<code>alpha-3</code>"));
        assert!(page.contains(r#"action="/upload-country""#));
    }
}
