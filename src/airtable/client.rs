//! Airtable REST client
//!
//! Read-only access to record listings and base metadata. Credentials are
//! passed in through [`AirtableConfig`]; nothing is read from globals here.

use super::types::{Page, TableSchema, TablesResponse};
use super::{AirtableError, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.airtable.com";

/// Largest page the service will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Connection settings for the table service.
#[derive(Clone)]
pub struct AirtableConfig {
    pub api_url: String,
    pub token: String,
    pub request_timeout: Duration,
}

impl AirtableConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_url", &self.api_url)
            .field("token", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Query for a single page of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page_size: u32,
    pub offset: Option<String>,
    pub max_records: Option<usize>,
}

/// Airtable API client
#[derive(Debug, Clone)]
pub struct AirtableClient {
    config: AirtableConfig,
    base_url: Url,
    http: reqwest::Client,
}

impl AirtableClient {
    pub fn new(config: AirtableConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| AirtableError::InvalidUrl(format!("{}: {}", config.api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AirtableError::InvalidUrl(config.api_url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            base_url,
            http,
        })
    }

    /// `{api}/v0/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AirtableError::InvalidUrl(self.config.api_url.clone()))?;
            path.pop_if_empty().push("v0");
            path.extend(segments);
        }
        Ok(url)
    }

    /// URL of the record listing for a table.
    pub fn records_url(&self, base_id: &str, table: &str, query: &PageQuery) -> Result<Url> {
        let mut url = self.endpoint(&[base_id, table])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("pageSize", &query.page_size.to_string());
            if let Some(max) = query.max_records {
                pairs.append_pair("maxRecords", &max.to_string());
            }
            if let Some(offset) = &query.offset {
                pairs.append_pair("offset", offset);
            }
        }
        Ok(url)
    }

    /// Fetch one page of records.
    pub async fn list_records_page(
        &self,
        base_id: &str,
        table: &str,
        query: &PageQuery,
    ) -> Result<Page> {
        let url = self.records_url(base_id, table, query)?;
        self.get_json(url).await
    }

    /// List the tables of a base via the metadata endpoint.
    pub async fn list_tables(&self, base_id: &str) -> Result<Vec<TableSchema>> {
        let url = self.endpoint(&["meta", "bases", base_id, "tables"])?;
        let response: TablesResponse = self.get_json(url).await?;
        Ok(response.tables)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AirtableError::CredentialRejected {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(AirtableError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| AirtableError::Protocol(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AirtableClient {
        AirtableClient::new(AirtableConfig::new("pat-test")).unwrap()
    }

    #[test]
    fn test_records_url_encodes_table_name() {
        let query = PageQuery {
            page_size: 100,
            ..Default::default()
        };
        let url = client().records_url("appBase", "Veo3 Videos", &query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.airtable.com/v0/appBase/Veo3%20Videos?pageSize=100"
        );
    }

    #[test]
    fn test_records_url_escapes_slash_in_table() {
        let query = PageQuery {
            page_size: 10,
            ..Default::default()
        };
        let url = client().records_url("appBase", "Ads/Q3", &query).unwrap();
        assert!(url.path().ends_with("/Ads%2FQ3"));
    }

    #[test]
    fn test_records_url_with_offset_and_cap() {
        let query = PageQuery {
            page_size: 50,
            offset: Some("itr/abc".to_string()),
            max_records: Some(5),
        };
        let url = client().records_url("appBase", "Ads", &query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("pageSize".to_string(), "50".to_string()),
                ("maxRecords".to_string(), "5".to_string()),
                ("offset".to_string(), "itr/abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_api_url_with_path_prefix() {
        let config = AirtableConfig::new("t").with_api_url("http://127.0.0.1:9000/proxy/");
        let client = AirtableClient::new(config).unwrap();
        let url = client.endpoint(&["meta", "bases", "appX", "tables"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/proxy/v0/meta/bases/appX/tables");
    }

    #[test]
    fn test_invalid_api_url() {
        let config = AirtableConfig::new("t").with_api_url("not a url");
        assert!(matches!(
            AirtableClient::new(config),
            Err(AirtableError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", AirtableConfig::new("pat-secret"));
        assert!(!rendered.contains("pat-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
