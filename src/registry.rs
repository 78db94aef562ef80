use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::{config::RegistrySettings, error::Error};

/// One record of the Packagist search listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub description: String,
    pub url: String,
    pub repository: String,
    pub downloads: i64,
    pub favers: i64,
}

/// One page of the search listing. `next` is absent on the last page.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total: i64,
    pub next: Option<String>,
    pub results: Vec<SearchResult>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    fn first_page_url(&self) -> String;

    /// Fetch one page. `Ok(None)` means the server returned an empty body,
    /// which ends the listing; a malformed body is a decode error.
    async fn fetch_page(&self, url: &str) -> Result<Option<SearchPage>, Error>;
}

pub struct PackagistClient {
    http: Client,
    base_url: Url,
    settings: RegistrySettings,
}

impl PackagistClient {
    pub fn build(settings: RegistrySettings) -> Result<Self, Error> {
        let base_url = Url::parse(&settings.base_url).map_err(|source| Error::InvalidUrl {
            url: settings.base_url.clone(),
            source,
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url,
            settings,
        })
    }

    /// The server may hand back `next` as an absolute URL or a bare path.
    fn resolve(&self, url: &str) -> Result<Url, Error> {
        self.base_url.join(url).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SearchClient for PackagistClient {
    fn first_page_url(&self) -> String {
        format!(
            "/search.json?tags={}&type={}&per_page={}&page=1",
            self.settings.tags, self.settings.package_type, self.settings.per_page
        )
    }

    #[instrument(name = "fetch_page", skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<Option<SearchPage>, Error> {
        let request_url = self.resolve(url)?;

        let response = self
            .http
            .get(request_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| Error::Transport {
                url: url.to_string(),
                source,
            })?;

        let body = response.bytes().await.map_err(|source| Error::Transport {
            url: url.to_string(),
            source,
        })?;

        if body.is_empty() {
            return Ok(None);
        }

        let page =
            serde_json::from_slice::<SearchPage>(&body).map_err(|source| Error::DecodePage {
                url: url.to_string(),
                source,
            })?;

        Ok(Some(page))
    }
}

pub fn decode_next_url(next: &str) -> Result<String, Error> {
    urlencoding::decode(next)
        .map(|decoded| decoded.into_owned())
        .map_err(|source| Error::DecodeNextUrl {
            url: next.to_string(),
            source,
        })
}
