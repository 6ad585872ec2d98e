//! Plain-text notification rendering

use check_result::{CheckResult, ResultKind};
use chrono::{TimeZone, Utc};

fn format_date(time: i64) -> String {
    match Utc.timestamp_opt(time, 0).single() {
        Some(date) => date.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => time.to_string(),
    }
}

fn status_label(result: &CheckResult) -> &'static str {
    match result.kind() {
        ResultKind::NewFailure => "ERR",
        ResultKind::DuplicateFailure => "ERR-DUP",
        ResultKind::Recovery => "RECOVERED",
        ResultKind::Success => "OK",
    }
}

/// Render the notification subject line, e.g.
/// `Watchtower [ERR-DUP] (my-tag): example.com must run ssl (2026-01-02 03:04:05 UTC)`
pub fn render_subject(result: &CheckResult) -> String {
    let tag = if result.tag.is_empty() {
        String::new()
    } else {
        format!(" ({})", result.tag)
    };
    format!(
        "Watchtower [{}]{}: {} ({})",
        status_label(result),
        tag,
        result.display_name(),
        format_date(result.time)
    )
}

/// Render the notification body.
pub fn render_body(result: &CheckResult) -> String {
    let mut body = String::from("Watchtower:");

    match (&result.error, result.recovered) {
        (Some(error), _) => {
            if result.is_dedup {
                body.push_str(&format!(" Error (duplicated): {}\n", error));
            } else {
                body.push_str(&format!(" Error: {}\n", error));
            }
        }
        (None, true) => body.push_str(" Test recovered\n"),
        (None, false) => body.push_str(" Test ok\n"),
    }

    if let Some(details) = &result.details {
        body.push_str(&format!("\nDetails: {}\n", details));
    }

    let tag = if result.tag.is_empty() {
        "None"
    } else {
        &result.tag
    };
    body.push_str(&format!("\nTag: {}\nInput: {}\n", tag, result.input));
    body.push_str(&format!(
        "\nTarget: {}\nType: {}\nDate: {}\n",
        result.target,
        result.check_type,
        format_date(result.time)
    ));

    body
}
