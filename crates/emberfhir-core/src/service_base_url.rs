//! Service base URL registry.
//!
//! Every reference index row pins the authority it points at. The primary
//! entry is the server's own base URL; remote authorities are registered
//! lazily the first time a stored resource references them.

use crate::error::{CoreError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

/// One known service authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBaseUrl {
    pub id: Uuid,
    /// Normalized absolute URL, no trailing slash.
    pub url: String,
    pub is_primary: bool,
}

impl ServiceBaseUrl {
    pub fn new(url: &str, is_primary: bool) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            url: normalize_service_base_url(url)?,
            is_primary,
        })
    }
}

/// Normalize and validate a service base URL: absolute http(s), trailing
/// slash removed.
pub fn normalize_service_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(CoreError::invalid_service_base_url("empty URL"));
    }
    let parsed = url::Url::parse(trimmed)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CoreError::invalid_service_base_url(format!(
            "unsupported scheme '{}': {trimmed}",
            parsed.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

/// Lookup and registration of service base URLs.
///
/// Registering a new primary demotes the previous one; implementations must
/// apply that pair of updates atomically so no reader observes zero or two
/// primaries.
#[async_trait]
pub trait ServiceBaseUrlRegistry: Send + Sync {
    /// The server's own base URL, if one has been registered.
    async fn get_primary(&self) -> Result<Option<ServiceBaseUrl>>;

    /// Look up an authority by its normalized URL.
    async fn get_by_url(&self, url: &str) -> Result<Option<ServiceBaseUrl>>;

    /// Register an authority, returning the stored entry.
    async fn add(&self, base_url: ServiceBaseUrl) -> Result<ServiceBaseUrl>;
}

/// In-memory registry for embedded use and tests.
#[derive(Debug, Default)]
pub struct MemoryServiceBaseUrlRegistry {
    entries: RwLock<Vec<ServiceBaseUrl>>,
}

impl MemoryServiceBaseUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a registry seeded with the server's own base URL.
    pub fn with_primary(url: &str) -> Result<Self> {
        let registry = Self::new();
        let primary = ServiceBaseUrl::new(url, true)?;
        registry
            .entries
            .write()
            .map_err(|_| CoreError::configuration("service base URL registry lock poisoned"))?
            .push(primary);
        Ok(registry)
    }

    fn read_entries(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<ServiceBaseUrl>>> {
        self.entries
            .read()
            .map_err(|_| CoreError::configuration("service base URL registry lock poisoned"))
    }
}

#[async_trait]
impl ServiceBaseUrlRegistry for MemoryServiceBaseUrlRegistry {
    async fn get_primary(&self) -> Result<Option<ServiceBaseUrl>> {
        Ok(self.read_entries()?.iter().find(|e| e.is_primary).cloned())
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<ServiceBaseUrl>> {
        let normalized = url.trim().trim_end_matches('/');
        Ok(self
            .read_entries()?
            .iter()
            .find(|e| e.url == normalized)
            .cloned())
    }

    async fn add(&self, base_url: ServiceBaseUrl) -> Result<ServiceBaseUrl> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CoreError::configuration("service base URL registry lock poisoned"))?;

        if let Some(existing) = entries.iter().find(|e| e.url == base_url.url) {
            return Ok(existing.clone());
        }

        // Demote-and-insert happens under one write guard.
        if base_url.is_primary {
            for entry in entries.iter_mut() {
                entry.is_primary = false;
            }
        }

        tracing::debug!(url = %base_url.url, is_primary = base_url.is_primary, "registered service base URL");
        entries.push(base_url.clone());
        Ok(base_url)
    }
}
