use ossmount_core::{CommandGroup, CommandInfo};
use serde_json::Value;

use crate::style::Style;

/// Extra lines printed under the status line for listing commands.
pub(super) fn render(style: &Style, info: CommandInfo, details: &Value) -> Vec<String> {
    match (info.group, info.name) {
        (CommandGroup::Secret, "list") => table(
            style,
            &["#", "Bucket", "AccessKey ID"],
            details,
            "secrets",
            &["index", "bucket", "access_key_id"],
        ),
        (CommandGroup::Mount, "list") => table(
            style,
            &["Path", "Bucket", "Region", "Program"],
            details,
            "mounts",
            &["local_path", "bucket", "region", "program"],
        ),
        (CommandGroup::Status, _) => status_lines(details),
        _ => Vec::new(),
    }
}

fn table(
    style: &Style,
    headers: &[&str],
    details: &Value,
    key: &str,
    fields: &[&str],
) -> Vec<String> {
    let Some(entries) = details.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    if entries.is_empty() {
        return Vec::new();
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| fields.iter().map(|field| cell(&entry[*field])).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let header_cells: Vec<String> = headers.iter().map(ToString::to_string).collect();
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let mut lines = vec![
        style.header(&join_padded(&header_cells, &widths)),
        join_padded(&rule, &widths),
    ];
    lines.extend(rows.iter().map(|row| join_padded(row, &widths)));
    lines
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn status_lines(details: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |label: &str, value: &Value| {
        if !value.is_null() {
            lines.push(format!("  {label:<16}{}", cell(value)));
        }
    };
    push("home", &details["home"]);
    push("credentials", &details["store"]["path"]);
    push("primary config", &details["primary_config"]["path"]);
    push("link", &details["link"]["path"]);
    push("link state", &details["link"]["state"]);
    push("link target", &details["link"]["target"]);
    push("driver", &details["driver"]);
    lines
}
