//! Plain-text rendering of scan results.

use super::summary::TableSummary;
use crate::airtable::TableSchema;
use std::fmt::Write;

/// Render a [`TableSummary`] as the human-readable report printed by
/// `adscope introspect`.
pub fn render_text(summary: &TableSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Table: {} (base {})", summary.table, summary.base_id);
    let _ = writeln!(
        out,
        "Records: {} across {} page{}",
        summary.total_records,
        summary.pages,
        if summary.pages == 1 { "" } else { "s" }
    );

    if summary.fields.is_empty() {
        let _ = writeln!(out, "Fields: none");
    } else {
        let _ = writeln!(out, "Fields ({}):", summary.fields.len());
        for (i, field) in summary.fields.iter().enumerate() {
            let kind = field.kind.map(|k| k.as_str()).unwrap_or("-");
            let mut line = format!(
                "{:>3}. {:<25} | {:<14} | {:>5} | {}",
                i + 1,
                field.name,
                kind,
                field.count,
                field.preview
            );
            if !field.also_seen.is_empty() {
                let others: Vec<&str> = field.also_seen.iter().map(|k| k.as_str()).collect();
                let _ = write!(line, " (also seen: {})", others.join(", "));
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }

    if let Some(flag) = &summary.flag {
        if summary.flagged.is_empty() {
            let _ = writeln!(out, "No records matched \"{}\"", flag);
        } else {
            let _ = writeln!(
                out,
                "Flagged records matching \"{}\" ({}):",
                flag,
                summary.flagged.len()
            );
            for flagged in &summary.flagged {
                let _ = writeln!(out, "  {}: {}", flagged.id, flagged.matched_fields.join(", "));
            }
        }
    }

    out
}

/// Render the base metadata listing printed by `adscope tables`.
pub fn render_tables_text(base_id: &str, tables: &[TableSchema]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Base {}: {} table(s)", base_id, tables.len());
    for table in tables {
        let _ = writeln!(out, "  {} ({})", table.name, table.id);
        for (i, field) in table.fields.iter().enumerate() {
            let _ = writeln!(out, "    {:>2}. {} ({})", i + 1, field.name, field.field_type);
        }
    }
    out
}
