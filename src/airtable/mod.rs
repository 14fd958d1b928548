//! Airtable access
//!
//! - **AirtableClient**: bearer-token REST client for record listings and
//!   base metadata
//! - **PageSource**: the seam the introspector paginates through; the
//!   client's [`TableRef`] is the production implementation
//!
//! No request is ever retried. The first failure is returned to the caller.

pub mod client;
pub mod types;

pub use client::{AirtableClient, AirtableConfig, PageQuery, DEFAULT_API_URL, MAX_PAGE_SIZE};
pub use types::{FieldKind, FieldSchema, FieldValue, Fields, Page, Record, TableSchema};

use thiserror::Error;

/// Errors from the table service.
#[derive(Error, Debug)]
pub enum AirtableError {
    #[error("credentials rejected (HTTP {status}): {body}")]
    CredentialRejected { status: u16, body: String },

    #[error("table service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, AirtableError>;

/// Boxed future returned by [`PageSource`].
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Something that can serve pages of a single table.
pub trait PageSource: Send + Sync {
    /// Human-readable identity of the table, used in logs and reports.
    fn describe(&self) -> (&str, &str);

    /// Fetch one page.
    fn fetch_page(&self, query: PageQuery) -> BoxFuture<'_, Result<Page>>;
}

/// A table addressed through an [`AirtableClient`].
#[derive(Debug, Clone)]
pub struct TableRef {
    client: AirtableClient,
    base_id: String,
    table: String,
}

impl TableRef {
    pub fn new(client: AirtableClient, base_id: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            client,
            base_id: base_id.into(),
            table: table.into(),
        }
    }
}

impl PageSource for TableRef {
    fn describe(&self) -> (&str, &str) {
        (&self.base_id, &self.table)
    }

    fn fetch_page(&self, query: PageQuery) -> BoxFuture<'_, Result<Page>> {
        Box::pin(async move {
            self.client
                .list_records_page(&self.base_id, &self.table, &query)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_mentions_status() {
        let err = AirtableError::CredentialRejected {
            status: 401,
            body: r#"{"error":"invalid_token"}"#.to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("invalid_token"));
    }

    #[test]
    fn test_table_ref_describe() {
        let client = AirtableClient::new(AirtableConfig::new("t")).unwrap();
        let table = TableRef::new(client, "appBase", "Veo3 Videos");
        assert_eq!(table.describe(), ("appBase", "Veo3 Videos"));
    }
}
