//! Latest-version lookups against the public Terraform module registry.
//!
//! Lookups never fail: any network, status or decoding problem is logged
//! and reported as `None`, and callers keep the catalog's pinned version.

mod versions;

pub use versions::{CachedVersion, VersionCache};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::{AvmError, Result};
use crate::settings::RegistrySettings;

/// Split `namespace/name/provider`.
pub fn parse_module_source(source: &str) -> Result<(&str, &str, &str)> {
    let mut parts = source.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(ns), Some(name), Some(provider), None)
            if !ns.is_empty() && !name.is_empty() && !provider.is_empty() =>
        {
            Ok((ns, name, provider))
        }
        _ => Err(AvmError::Config(format!(
            "invalid module source format: {source}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ModuleSummary {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionListing {
    #[serde(default)]
    modules: Vec<ModuleVersions>,
}

#[derive(Debug, Deserialize)]
struct ModuleVersions {
    #[serde(default)]
    versions: Vec<ModuleSummary>,
}

/// Registry client with a cache in front of it.
pub struct RegistryClient {
    http: reqwest::Client,
    api_base: String,
    cache: VersionCache,
    max_concurrent: usize,
}

impl RegistryClient {
    pub fn new(settings: &RegistrySettings) -> Result<Self> {
        let cache = VersionCache::open(settings.resolved_cache_path(), settings.ttl_secs);
        Self::with_cache(settings, cache)
    }

    pub fn with_cache(settings: &RegistrySettings, cache: VersionCache) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tf-avm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            cache,
            max_concurrent: settings.max_concurrent.max(1),
        })
    }

    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    /// Latest published version of `source`, cache first.
    pub async fn latest_version(&self, source: &str) -> Option<String> {
        if let Some(version) = self.cache.get(source) {
            debug!(source = %source, version = %version, "version cache hit");
            return Some(version);
        }

        let (ns, name, provider) = match parse_module_source(source) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(source = %source, error = %e, "skipping version lookup");
                return None;
            }
        };
        let url = format!("{}/{ns}/{name}/{provider}", self.api_base);

        match self.fetch::<ModuleSummary>(&url).await {
            Ok(ModuleSummary {
                version: Some(version),
            }) => {
                info!(event = "registry.version_fetched", source = %source, version = %version);
                self.cache.set(source, &version);
                Some(version)
            }
            Ok(_) => {
                warn!(source = %source, "registry response has no version");
                None
            }
            Err(e) => {
                warn!(source = %source, error = %e, "version lookup failed");
                None
            }
        }
    }

    /// Every published version of `source`, as listed by the registry.
    /// Not cached; failures yield an empty list.
    pub async fn all_versions(&self, source: &str) -> Vec<String> {
        let Ok((ns, name, provider)) = parse_module_source(source) else {
            warn!(source = %source, "skipping version listing for malformed source");
            return Vec::new();
        };
        let url = format!("{}/{ns}/{name}/{provider}/versions", self.api_base);

        match self.fetch::<VersionListing>(&url).await {
            Ok(listing) => listing
                .modules
                .into_iter()
                .next()
                .map(|m| m.versions.into_iter().filter_map(|v| v.version).collect())
                .unwrap_or_default(),
            Err(e) => {
                warn!(source = %source, error = %e, "version listing failed");
                Vec::new()
            }
        }
    }

    /// Bypass the cache for one source.
    pub async fn refresh(&self, source: &str) -> Option<String> {
        self.cache.invalidate(source);
        self.latest_version(source).await
    }

    /// Latest versions for many sources, at most `max_concurrent` requests
    /// in flight.
    pub async fn batch_latest<S: AsRef<str>>(&self, sources: &[S]) -> BTreeMap<String, Option<String>> {
        let sem = Arc::new(Semaphore::new(self.max_concurrent));
        let lookups = sources.iter().map(|source| {
            let sem = Arc::clone(&sem);
            async move {
                let _permit = sem.acquire_owned().await.ok();
                let source = source.as_ref();
                (source.to_string(), self.latest_version(source).await)
            }
        });
        futures::future::join_all(lookups).await.into_iter().collect()
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}
