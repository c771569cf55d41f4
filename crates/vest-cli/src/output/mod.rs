//! Rendering command results as JSON or tables.

use std::io::IsTerminal;

use serde::Serialize;
use serde_json::{Map, Value};
use vest_core::money::format_cents;

use crate::cli::OutputFormat;

pub mod table;

/// Render `value` in the requested format.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn render<T: Serialize>(value: &T, format: OutputFormat, options: table::TableOptions) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
        OutputFormat::Table => Ok(render_table(serde_json::to_value(value)?, options)),
    }
}

/// Print `value` to stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render(value, format, terminal_options(format))?);
    Ok(())
}

fn terminal_options(format: OutputFormat) -> table::TableOptions {
    let tty = std::io::stdout().is_terminal();
    table::TableOptions {
        max_width: std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|w| *w >= 40),
        color: tty && format == OutputFormat::Table && std::env::var_os("NO_COLOR").is_none(),
    }
}

fn render_table(value: Value, options: table::TableOptions) -> String {
    match value {
        // Pages render their items.
        Value::Object(mut map) if map.get("items").is_some_and(Value::is_array) => {
            let Some(Value::Array(items)) = map.remove("items") else {
                return String::new();
            };
            render_rows(&items, options)
        }
        Value::Object(map) => render_record(map, options),
        Value::Array(items) => render_rows(&items, options),
        scalar => table::render(&["value"], &[vec![cell(None, &scalar)]], options),
    }
}

fn render_record(map: Map<String, Value>, options: table::TableOptions) -> String {
    let rows: Vec<Vec<String>> = map
        .iter()
        .map(|(key, value)| vec![key.clone(), cell(Some(key), value)])
        .collect();
    table::render(&["field", "value"], &rows, options)
}

fn render_rows(items: &[Value], options: table::TableOptions) -> String {
    if items.is_empty() {
        return "(no rows)".to_string();
    }

    // Column order follows the first record, then any keys seen later.
    let mut headers: Vec<String> = Vec::new();
    for map in items.iter().filter_map(Value::as_object) {
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    if headers.is_empty() {
        let rows: Vec<Vec<String>> = items.iter().map(|v| vec![cell(None, v)]).collect();
        return table::render(&["value"], &rows, options);
    }

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            headers
                .iter()
                .map(|h| item.get(h).map_or_else(|| "-".to_string(), |v| cell(Some(h), v)))
                .collect()
        })
        .collect();
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    table::render(&header_refs, &rows, options)
}

/// Cents columns are shown as decimal amounts.
fn cell(key: Option<&str>, value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match (key, n.as_i64()) {
            (Some(k), Some(cents)) if k.ends_with("_cents") => format_cents(cents),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        nested => nested.to_string(),
    }
}
