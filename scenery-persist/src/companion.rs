//! Client for the local development companion server.
//!
//! The companion exposes a single document slot over
//! `GET`/`POST /api/config` (no id parameter). It only participates in
//! persistence when the configured URL points at a loopback host, so
//! production deployments never talk to it.

use reqwest::Client;
use serde_json::Value;
use url::{Host, Url};

use scenery_core::SceneDocument;

use crate::error::CompanionError;

/// Whether a URL points at a loopback/development host.
#[must_use]
pub fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// HTTP client for the companion's single config slot.
#[derive(Debug, Clone)]
pub struct CompanionClient {
    http: Client,
    endpoint: Url,
}

impl CompanionClient {
    /// Create a client for a companion base URL; the slot lives at
    /// `{base}/api/config`.
    ///
    /// # Errors
    ///
    /// Returns [`CompanionError::InvalidUrl`] if the URL is malformed
    /// and [`CompanionError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, CompanionError> {
        let mut base = Url::parse(base_url.as_ref())
            .map_err(|e| CompanionError::InvalidUrl(e.to_string()))?;
        // Url::join treats a base without a trailing slash as a file.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("api/config")
            .map_err(|e| CompanionError::InvalidUrl(e.to_string()))?;
        let http = Client::builder()
            .user_agent(concat!("scenery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoint })
    }

    /// Whether this companion runs on a loopback host and may be used as
    /// a persistence tier.
    #[must_use]
    pub fn is_dev_host(&self) -> bool {
        is_loopback_host(&self.endpoint)
    }

    /// Fetch the stored document. Returns `None` when the slot is empty
    /// (the companion answers JSON `null`).
    ///
    /// # Errors
    ///
    /// Returns [`CompanionError`] on network failures or non-success
    /// statuses.
    pub async fn fetch(&self) -> Result<Option<Value>, CompanionError> {
        let response = self.http.get(self.endpoint.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CompanionError::Status(status.as_u16()));
        }
        let value: Value = response.json().await?;
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    /// Mirror the full document into the slot.
    ///
    /// # Errors
    ///
    /// Returns [`CompanionError`] on network failures or non-success
    /// statuses.
    pub async fn push(&self, document: &SceneDocument) -> Result<(), CompanionError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(document)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CompanionError::Status(status.as_u16()))
        }
    }
}
