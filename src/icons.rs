//! Application icon resolution.
//!
//! Maps a Gotify application id to the public URL of its image. The map is
//! filled lazily: a miss refetches the whole application list so every
//! currently known application becomes resolvable in one round trip.
//!
//! Resolution is best effort. Any failure yields an empty string and is
//! not cached, so the next lookup tries the registry again.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::IconError;
use crate::gotify::Application;

/// Caches application image paths fetched from the Gotify registry.
#[derive(Debug)]
pub struct IconResolver {
    client: reqwest::Client,
    registry_url: reqwest::Url,
    base_url: String,
    icons: HashMap<u32, String>,
}

impl IconResolver {
    /// Creates an empty resolver.
    ///
    /// `registry_url` is the full `/application?token=…` URL; `base_url` is
    /// prefixed to every image path returned.
    pub fn new(
        registry_url: reqwest::Url,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, registry_url, base_url))
    }

    /// Creates an empty resolver that shares an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        registry_url: reqwest::Url,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            registry_url,
            base_url: base_url.into(),
            icons: HashMap::new(),
        }
    }

    /// Returns the icon URL for `app_id`, or an empty string if unknown.
    pub async fn resolve(&mut self, app_id: u32) -> String {
        if let Some(path) = self.icons.get(&app_id) {
            return self.icon_url(path);
        }

        match self.refresh().await {
            Ok(count) => {
                log::debug!("[Icons] Refreshed {} application icons", count);
            }
            Err(e) => {
                log::warn!("[Icons] Failed to refresh application list: {}", e);
                return String::new();
            }
        }

        match self.icons.get(&app_id) {
            Some(path) => self.icon_url(path),
            None => {
                log::debug!("[Icons] Application {} not in registry", app_id);
                String::new()
            }
        }
    }

    /// Fetches the application list and upserts every id → image pair.
    ///
    /// Returns the number of applications received.
    pub async fn refresh(&mut self) -> Result<usize, IconError> {
        let response = self
            .client
            .get(self.registry_url.clone())
            .send()
            .await
            .map_err(IconError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IconError::Status(status.as_u16()));
        }

        let apps: Vec<Application> = response.json().await.map_err(IconError::Decode)?;
        let count = apps.len();
        for app in apps {
            self.icons.insert(app.id, app.image.unwrap_or_default());
        }
        Ok(count)
    }

    fn icon_url(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        format!("{}{}", self.base_url, path)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.icons.len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
