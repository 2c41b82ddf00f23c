//! Zotero Web API v3 client.
//!
//! Only the two read calls the sync needs are implemented: the top-level
//! items of a collection (paginated through the `Link` header) and the
//! file of an attachment item.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, Response, StatusCode};
use std::sync::OnceLock;
use tracing::{debug, error, info};

use crate::config::{LibraryType, SyncConfig};
use crate::contract::ItemSource;
use crate::error::ApiError;
use crate::item::{BibliographicItem, ZoteroItem};

pub const API_VERSION: &str = "3";
pub const PAGE_SIZE: usize = 100;

pub struct ZoteroClient {
    client: Client,
    api_key: String,
    library: String,
    base_url: String,
}

impl ZoteroClient {
    pub fn new(
        api_key: impl Into<String>,
        library_type: LibraryType,
        library_id: &str,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("zotero-git-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            library: format!("{}/{}", library_type.path_segment(), library_id),
            base_url: crate::config::DEFAULT_ZOTERO_API_URL.to_string(),
        })
    }

    /// Point the client at another API root (self-hosted mirror, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, ApiError> {
        Ok(Self::new(
            config.zotero_api_key.clone(),
            config.zotero_library_type,
            &config.zotero_user_id,
        )?
        .with_base_url(config.zotero_api_url.clone()))
    }

    async fn get(&self, url: &str, resource: &str) -> Result<Response, ApiError> {
        debug!(url = %url, "GET Zotero API");
        let response = self
            .client
            .get(url)
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Failed to reach Zotero API");
                ApiError::Transport(e)
            })?;
        check_status(response, resource).await
    }
}

async fn check_status(response: Response, resource: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!(status = %status, resource, "Zotero rejected the API key");
            Err(ApiError::Unauthorized {
                status: status.as_u16(),
            })
        }
        StatusCode::NOT_FOUND => {
            error!(resource, "Zotero resource not found");
            Err(ApiError::NotFound {
                resource: resource.to_string(),
            })
        }
        _ => {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, resource, "Zotero API returned error. Response body: {body}");
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn next_link_pattern() -> &'static Regex {
    static NEXT: OnceLock<Regex> = OnceLock::new();
    NEXT.get_or_init(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?\s*(?:;|$)"#).expect("static regex"))
}

/// Extracts the `rel="next"` target of an RFC 8288 `Link` header.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|part| {
            next_link_pattern()
                .captures(part)
                .map(|c| c[1].trim().to_string())
        })
}

#[async_trait]
impl ItemSource for ZoteroClient {
    async fn collection_items(
        &self,
        collection_id: &str,
    ) -> Result<Vec<BibliographicItem>, ApiError> {
        let resource = format!("collection {collection_id}");
        let mut url = format!(
            "{}/{}/collections/{}/items/top?format=json&limit={}&start=0",
            self.base_url, self.library, collection_id, PAGE_SIZE
        );
        let mut items = Vec::new();

        loop {
            let response = self.get(&url, &resource).await?;
            let next = next_link(response.headers());
            let body = response.text().await?;
            let page: Vec<ZoteroItem> = serde_json::from_str(&body).map_err(|e| {
                error!(error = ?e, url = %url, "Failed to parse Zotero items JSON");
                ApiError::Decode(e.to_string())
            })?;
            debug!(page_items = page.len(), url = %url, "Fetched page of collection items");
            items.extend(page.into_iter().map(BibliographicItem::from));

            match next {
                Some(next) if next != url => url = next,
                _ => break,
            }
        }

        info!(collection = collection_id, items = items.len(), "Fetched collection items");
        Ok(items)
    }

    async fn attachment_file(&self, attachment_key: &str) -> Result<Vec<u8>, ApiError> {
        let url = format!(
            "{}/{}/items/{}/file",
            self.base_url, self.library, attachment_key
        );
        let response = self
            .get(&url, &format!("attachment {attachment_key}"))
            .await?;
        let bytes = response.bytes().await?;
        debug!(attachment = attachment_key, bytes = bytes.len(), "Downloaded attachment file");
        Ok(bytes.to_vec())
    }
}
