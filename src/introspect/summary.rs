//! Scan accumulation
//!
//! [`SummaryBuilder`] folds records into per-field summaries as pages arrive,
//! so the whole table never has to be held in memory.

use super::preview::preview;
use crate::airtable::{FieldKind, Record};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Structural summary of one field across a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub name: String,
    /// Kind of the first non-absent value; `None` if the field was only
    /// ever absent.
    pub kind: Option<FieldKind>,
    pub preview: String,
    /// Records in which the field carried a value.
    pub count: usize,
    /// Kinds seen after the first that disagree with `kind`.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub also_seen: BTreeSet<FieldKind>,
}

/// A record whose string content matched the flag predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedRecord {
    pub id: String,
    pub matched_fields: Vec<String>,
}

/// Result of a full table scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub base_id: String,
    pub table: String,
    pub total_records: usize,
    pub pages: usize,
    pub record_ids: Vec<String>,
    pub fields: Vec<FieldSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    pub flagged: Vec<FlaggedRecord>,
}

impl TableSummary {
    pub fn field(&self, name: &str) -> Option<&FieldSummary> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Accumulates records into a [`TableSummary`].
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    flag: Option<String>,
    flag_lower: Option<String>,
    record_ids: Vec<String>,
    seen_ids: HashSet<String>,
    fields: Vec<FieldSummary>,
    index: HashMap<String, usize>,
    flagged: Vec<FlaggedRecord>,
    pages: usize,
}

impl SummaryBuilder {
    pub fn new(flag: Option<String>) -> Self {
        let flag = flag.filter(|f| !f.is_empty());
        Self {
            flag_lower: flag.as_ref().map(|f| f.to_lowercase()),
            flag,
            ..Default::default()
        }
    }

    pub fn record_count(&self) -> usize {
        self.record_ids.len()
    }

    pub fn page_received(&mut self) {
        self.pages += 1;
    }

    /// Fold one record in. Returns `false` (and ignores the record) if its
    /// id was already seen in this scan.
    pub fn push(&mut self, record: Record) -> bool {
        if !self.seen_ids.insert(record.id.clone()) {
            warn!(record = %record.id, "duplicate record id in scan, skipping");
            return false;
        }

        let mut matched = Vec::new();
        for (name, value) in record.fields.iter() {
            let slot = match self.index.get(name) {
                Some(&i) => i,
                None => {
                    self.fields.push(FieldSummary {
                        name: name.clone(),
                        kind: None,
                        preview: String::new(),
                        count: 0,
                        also_seen: BTreeSet::new(),
                    });
                    self.index.insert(name.clone(), self.fields.len() - 1);
                    self.fields.len() - 1
                }
            };
            let summary = &mut self.fields[slot];

            if let Some(kind) = value.kind() {
                summary.count += 1;
                match summary.kind {
                    None => {
                        summary.kind = Some(kind);
                        summary.preview = preview(&value.canonical_string());
                    }
                    Some(first) if first != kind => {
                        if summary.also_seen.insert(kind) {
                            warn!(
                                field = %name,
                                first = %first,
                                seen = %kind,
                                record = %record.id,
                                "field kind disagrees with first-seen kind"
                            );
                        }
                    }
                    Some(_) => {}
                }
            }

            if let Some(needle) = &self.flag_lower {
                if value
                    .text_values()
                    .iter()
                    .any(|s| s.to_lowercase().contains(needle.as_str()))
                {
                    matched.push(name.clone());
                }
            }
        }

        if !matched.is_empty() {
            self.flagged.push(FlaggedRecord {
                id: record.id.clone(),
                matched_fields: matched,
            });
        }
        self.record_ids.push(record.id);
        true
    }

    pub fn finish(self, base_id: &str, table: &str) -> TableSummary {
        TableSummary {
            base_id: base_id.to_string(),
            table: table.to_string(),
            total_records: self.record_ids.len(),
            pages: self.pages,
            record_ids: self.record_ids,
            fields: self.fields,
            flag: self.flag,
            flagged: self.flagged,
        }
    }
}
