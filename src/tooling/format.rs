//! Render a store's visible tree as a table or JSON.

use crate::record::Record;
use crate::store::TreeStore;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::{json, Value};

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Cell text for a field value; null renders empty.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn columns(store: &TreeStore) -> Vec<String> {
    let schema = store.schema();
    schema
        .field_names()
        .into_iter()
        .filter(|name| *name != schema.children_field)
        .collect()
}

fn marker(record: &Record) -> &'static str {
    if record.is_expandable() {
        "+"
    } else if record.has_children() {
        "-"
    } else {
        " "
    }
}

fn push_rows(table: &mut Table, records: &[Record], prefix: &[usize], fields: &[String]) {
    for (index, record) in records.iter().enumerate() {
        let mut path = prefix.to_vec();
        path.push(index);
        let label = path
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(".");
        let mut cells = vec![format!(
            "{}{} {}",
            "  ".repeat(prefix.len()),
            marker(record),
            label
        )];
        cells.extend(fields.iter().map(|field| display_value(&record.get(field))));
        table.add_row(cells);
        push_rows(table, record.children().as_slice(), &path, fields);
    }
}

/// Visible tree as a bordered table, followed by a paging summary.
pub fn format_store_text(store: &TreeStore) -> String {
    let fields = columns(store);
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Records")));

    if store.count() == 0 {
        out.push_str("  No records\n\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        let mut header = vec!["Path".to_string()];
        header.extend(fields.iter().cloned());
        table.set_header(header);
        push_rows(&mut table, store.records(), &[], &fields);
        out.push_str(&format!("{}\n\n", table));
    }

    out.push_str(&format!(
        "Showing {} of {} (page {}/{})",
        store.count(),
        store.total(),
        store.page(),
        store.page_count()
    ));
    if !store.sorters().is_empty() {
        let sorters: Vec<String> = store
            .sorters()
            .iter()
            .map(|(field, direction)| format!("{} {}", field, direction))
            .collect();
        out.push_str(&format!("\nSorted by {}", sorters.join(", ")));
    }
    out
}

fn record_json(record: &Record, children_field: &str) -> Value {
    let mut row = record.data();
    let children = record.children();
    if children.is_loaded() {
        row.insert(
            children_field.to_string(),
            Value::Array(
                children
                    .as_slice()
                    .iter()
                    .map(|child| record_json(child, children_field))
                    .collect(),
            ),
        );
    } else if children.is_pending() {
        row.insert(children_field.to_string(), Value::Bool(true));
    }
    Value::Object(row)
}

/// Visible tree as JSON with paging metadata.
pub fn format_store_json(store: &TreeStore) -> Result<String, serde_json::Error> {
    let children_field = &store.schema().children_field;
    let records: Vec<Value> = store
        .records()
        .iter()
        .map(|record| record_json(record, children_field))
        .collect();
    serde_json::to_string_pretty(&json!({
        "count": store.count(),
        "total": store.total(),
        "page": store.page(),
        "page_count": store.page_count(),
        "sorters": store.sorters(),
        "filters": store.filters(),
        "filterMode": store.filter_mode(),
        "records": records,
    }))
}
