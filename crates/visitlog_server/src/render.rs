use crate::pages::PageId;
use chrono::{DateTime, Utc};
use visitlog_domain::{SettingsPage, SettingsRecord};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Banner {
    Saved,
    Error(String),
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        html_escape(title)
    )
}

fn render_record(record: &SettingsRecord) -> String {
    let mut html = String::new();
    html.push_str("<dl>\n");
    html.push_str(&format!(
        "<dt>Name</dt><dd>{}</dd>\n",
        html_escape(&record.name)
    ));
    html.push_str(&format!(
        "<dt>Visit count</dt><dd id=\"visit-count\">{}</dd>\n",
        record.visit_count
    ));
    html.push_str(&format!(
        "<dt>Last visit</dt><dd>{}</dd>\n",
        format_timestamp(record.last_visit_at)
    ));
    html.push_str(&format!(
        "<dt>Receive notifications</dt><dd>{}</dd>\n",
        if record.receive_notifications { "Yes" } else { "No" }
    ));
    html.push_str("</dl>\n<h2>Log</h2>\n<pre id=\"log\">");
    let lines = record.log_lines().map(html_escape).collect::<Vec<_>>();
    html.push_str(&lines.join("\n"));
    html.push_str("</pre>\n");
    html
}

pub fn render_settings_page(id: PageId, page: &SettingsPage, banner: Option<&Banner>) -> String {
    let mut body = String::from("<h1>Settings</h1>\n");

    match banner {
        Some(Banner::Saved) => {
            body.push_str("<p class=\"status\" id=\"status\">Settings saved.</p>\n");
        }
        Some(Banner::Error(message)) => {
            body.push_str(&format!(
                "<p class=\"error\" id=\"status\">{}</p>\n",
                html_escape(message)
            ));
        }
        None => {}
    }

    match page.record() {
        Some(record) => {
            body.push_str(&render_record(record));
            body.push_str(&format!(
                "<form method=\"post\" action=\"/settings/{id}/save\">\
                 <button type=\"submit\">Save settings</button></form>\n"
            ));
        }
        None => body.push_str("<p>Settings are not available.</p>\n"),
    }

    body.push_str(&format!(
        "<form method=\"post\" action=\"/settings/{id}/close\">\
         <button type=\"submit\">Close</button></form>\n"
    ));

    layout("Settings", &body)
}

pub fn render_error_page(message: &str) -> String {
    layout(
        "Settings unavailable",
        &format!(
            "<h1>Settings unavailable</h1>\n<p class=\"error\" id=\"status\">{}</p>\n\
             <p><a href=\"/settings\">Try again</a></p>\n",
            html_escape(message)
        ),
    )
}

pub fn render_closed_page(id: PageId) -> String {
    layout(
        "Settings closed",
        &format!(
            "<h1>Settings closed</h1>\n<p>Page {id} was closed.</p>\n\
             <p><a href=\"/settings\">Open settings</a></p>\n"
        ),
    )
}
