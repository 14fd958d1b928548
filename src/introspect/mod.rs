//! Table introspection
//!
//! Walks every page of a table and reduces the records to a structural
//! summary: field kinds, previews, occurrence counts and flagged records.
//!
//! ```ignore
//! use adscope::airtable::{AirtableClient, AirtableConfig, TableRef};
//! use adscope::introspect::{IntrospectOptions, Introspector};
//!
//! let client = AirtableClient::new(AirtableConfig::new(token))?;
//! let table = TableRef::new(client, "appXXXX", "Veo3 Videos");
//! let summary = Introspector::new(IntrospectOptions::default()).scan(&table).await?;
//! println!("{}", adscope::introspect::render_text(&summary));
//! ```

pub mod preview;
pub mod report;
pub mod summary;

pub use preview::{preview, ELLIPSIS, PREVIEW_LIMIT};
pub use report::{render_tables_text, render_text};
pub use summary::{FieldSummary, FlaggedRecord, SummaryBuilder, TableSummary};

use crate::airtable::{AirtableError, PageQuery, PageSource, Result, MAX_PAGE_SIZE};
use tracing::{debug, info, warn};

/// Scan options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectOptions {
    pub page_size: u32,
    /// Stop after this many records.
    pub max_records: Option<usize>,
    /// Case-insensitive substring to flag records by.
    pub flag: Option<String>,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_records: None,
            flag: None,
        }
    }
}

impl IntrospectOptions {
    /// Page size clamped into `1..=100`.
    pub fn effective_page_size(&self) -> u32 {
        let clamped = self.page_size.clamp(1, MAX_PAGE_SIZE);
        if clamped != self.page_size {
            warn!(
                requested = self.page_size,
                used = clamped,
                "page size out of range, clamping"
            );
        }
        clamped
    }
}

/// Drives pagination over a [`PageSource`].
#[derive(Debug, Clone, Default)]
pub struct Introspector {
    options: IntrospectOptions,
}

impl Introspector {
    pub fn new(options: IntrospectOptions) -> Self {
        Self { options }
    }

    /// Fetch every page (up to the record cap) and summarise.
    ///
    /// The first error aborts the scan.
    pub async fn scan(&self, source: &dyn PageSource) -> Result<TableSummary> {
        let (base_id, table) = source.describe();
        let page_size = self.options.effective_page_size();
        let cap = self.options.max_records;
        let mut builder = SummaryBuilder::new(self.options.flag.clone());
        let mut offset: Option<String> = None;

        info!(base = base_id, table = table, page_size, "scanning table");

        loop {
            if cap.is_some_and(|max| builder.record_count() >= max) {
                break;
            }

            let query = PageQuery {
                page_size,
                offset: offset.clone(),
                max_records: cap,
            };
            let page = source.fetch_page(query).await?;
            builder.page_received();
            debug!(
                records = page.records.len(),
                has_more = page.offset.is_some(),
                "page received"
            );

            for record in page.records {
                if cap.is_some_and(|max| builder.record_count() >= max) {
                    break;
                }
                builder.push(record);
            }

            match page.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    return Err(AirtableError::Protocol(format!(
                        "pagination offset did not advance ({})",
                        next
                    )));
                }
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        let summary = builder.finish(base_id, table);
        info!(
            records = summary.total_records,
            fields = summary.fields.len(),
            pages = summary.pages,
            flagged = summary.flagged.len(),
            "scan complete"
        );
        Ok(summary)
    }
}
