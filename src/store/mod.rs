// src/store/mod.rs

//! Local plugin store
//!
//! Resolves a `(name, version)` pair to plugin bytes on disk: cache hit
//! under `<cache-dir>/<name>_<version>.hpi`, registry download on a miss.
//! Manifest access opens the cached container, reads the fixed
//! `META-INF/MANIFEST.MF` entry, and memoizes the parsed result so each
//! distinct plugin version is fetched and parsed at most once per store.

mod client;

pub use client::RegistryClient;

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::resolver::ManifestSource;
use client::download_progress_bar;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed container path of the embedded manifest
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Default update-center download location
pub const DEFAULT_REGISTRY_URL: &str = "https://updates.jenkins.io/download/plugins";

/// On-disk plugin cache backed by the registry
pub struct PluginStore {
    cache_dir: PathBuf,
    registry_url: String,
    client: RegistryClient,
    manifests: HashMap<(String, String), Manifest>,
}

impl PluginStore {
    /// Create a store over the given cache directory and registry URL
    ///
    /// The cache directory is created on demand and never evicted.
    pub fn new(cache_dir: impl Into<PathBuf>, registry_url: impl Into<String>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| {
            Error::InitError(format!(
                "Failed to create cache directory {}: {e}",
                cache_dir.display()
            ))
        })?;

        Ok(Self {
            cache_dir,
            registry_url: registry_url.into(),
            client: RegistryClient::new()?,
            manifests: HashMap::new(),
        })
    }

    /// Registry download URL for a plugin version
    pub fn download_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/{name}/{version}/{name}.hpi",
            self.registry_url.trim_end_matches('/')
        )
    }

    /// Cache location for a plugin version
    pub fn cached_path(&self, name: &str, version: &str) -> PathBuf {
        self.cache_dir.join(format!("{name}_{version}.hpi"))
    }

    /// Path to the plugin binary, downloading into the cache on a miss
    pub fn fetch(&self, name: &str, version: &str) -> Result<PathBuf> {
        let path = self.cached_path(name, version);
        if path.exists() {
            debug!("Cache hit for {} {}", name, version);
            return Ok(path);
        }

        let url = self.download_url(name, version);
        let pb = download_progress_bar(name);
        self.client
            .download_file(&url, &path, name, Some(&pb))
            .inspect_err(|_| pb.abandon_with_message(format!("{name} [FAILED]")))?;
        pb.finish_with_message(format!("{name} [done]"));
        Ok(path)
    }

    /// Byte size of the cached plugin binary, fetching it first if needed
    pub fn size_of(&self, name: &str, version: &str) -> Result<u64> {
        let path = self.fetch(name, version)?;
        fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| Error::IoError(format!("Failed to stat {}: {e}", path.display())))
    }

    /// Parsed manifest of a plugin version, memoized per store
    pub fn manifest(&mut self, name: &str, version: &str) -> Result<Manifest> {
        let key = (name.to_string(), version.to_string());
        if let Some(manifest) = self.manifests.get(&key) {
            return Ok(manifest.clone());
        }

        let path = self.fetch(name, version)?;
        let raw = read_manifest_entry(&path).map_err(|reason| Error::InvalidPackage {
            name: name.to_string(),
            version: version.to_string(),
            reason,
        })?;

        let manifest = Manifest::parse(&raw).map_err(|e| match e {
            Error::InvalidManifest(msg) => {
                Error::InvalidManifest(format!("{name} {version}: {msg}"))
            }
            other => other,
        })?;

        self.manifests.insert(key, manifest.clone());
        Ok(manifest)
    }
}

impl ManifestSource for PluginStore {
    fn manifest(&mut self, name: &str, version: &str) -> Result<Manifest> {
        PluginStore::manifest(self, name, version)
    }
}

/// Read the embedded manifest entry out of a plugin container
fn read_manifest_entry(path: &Path) -> std::result::Result<Vec<u8>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open: {e}"))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("not a readable zip container: {e}"))?;
    let mut entry = archive
        .by_name(MANIFEST_ENTRY)
        .map_err(|e| format!("missing {MANIFEST_ENTRY}: {e}"))?;

    let mut raw = Vec::new();
    entry
        .read_to_end(&mut raw)
        .map_err(|e| format!("failed to read {MANIFEST_ENTRY}: {e}"))?;
    Ok(raw)
}
