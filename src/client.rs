use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{Mention, MentionPage};
use crate::error::WebmentionError;

pub const DEFAULT_ENDPOINT: &str = "https://webmention.io/api/mentions.jf2";

/// A paginated source of mentions. Each call returns the next page; an empty
/// page means the source is exhausted.
pub trait MentionSource: Send {
    fn fetch_page(&mut self) -> Result<Vec<Mention>, WebmentionError>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoint: String,
    pub domain: String,
    pub token: String,
    pub since_id: u64,
    pub page_size: u32,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct WebmentionHttpClient {
    client: Client,
    settings: ClientSettings,
    page: u32,
}

impl WebmentionHttpClient {
    pub fn new(settings: ClientSettings) -> Result<Self, WebmentionError> {
        if settings.page_size == 0 {
            return Err(WebmentionError::InvalidConfig(
                "page size must be greater than zero".to_string(),
            ));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("webmentions/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| WebmentionError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| WebmentionError::Http(err.to_string()))?;
        Ok(Self {
            client,
            settings,
            page: 0,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("domain", self.settings.domain.clone()),
            ("token", self.settings.token.clone()),
            ("per-page", self.settings.page_size.to_string()),
            ("since_id", self.settings.since_id.to_string()),
            ("page", self.page.to_string()),
        ]
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, WebmentionError> {
        let status = response.status().as_u16();
        if (200..400).contains(&status) {
            return Ok(response);
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "webmention request failed".to_string());
        Err(WebmentionError::Status { status, message })
    }
}

impl MentionSource for WebmentionHttpClient {
    fn fetch_page(&mut self) -> Result<Vec<Mention>, WebmentionError> {
        tracing::debug!(
            endpoint = %self.settings.endpoint,
            domain = %self.settings.domain,
            since_id = self.settings.since_id,
            page = self.page,
            "querying webmention endpoint"
        );
        let response = self
            .client
            .get(&self.settings.endpoint)
            .query(&self.query())
            .send()
            .map_err(|err| WebmentionError::Http(err.without_url().to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .bytes()
            .map_err(|err| WebmentionError::Http(err.without_url().to_string()))?;
        let page: MentionPage =
            serde_json::from_slice(&body).map_err(|err| WebmentionError::Decode(err.to_string()))?;

        self.page += 1;
        tracing::debug!(count = page.children.len(), "received page");
        Ok(page.children)
    }
}
