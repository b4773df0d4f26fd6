// src/config.rs

//! Run configuration
//!
//! A run is described by a TOML file: the plugins to resolve, the registry
//! to pull from, the cache location, the core version ceiling, and the
//! bundle size cap.
//!
//! ```toml
//! [registry]
//! url = "https://updates.jenkins.io/download/plugins"
//! cache_dir = "cache"
//!
//! [platform]
//! max_core_version = "2.401.3"
//!
//! [bundle]
//! output_dir = "bundles"
//! max_bundle_bytes = 104857600
//!
//! [[plugins]]
//! name = "git"
//! version = "5.0.2"
//! ```

use crate::bundle::DEFAULT_MAX_BUNDLE_BYTES;
use crate::error::{Error, Result};
use crate::resolver::PluginRef;
use crate::store::DEFAULT_REGISTRY_URL;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub bundle: BundleConfig,
    /// Requested plugins; transitive dependencies are resolved from these
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Base URL; plugin binaries live at `<url>/<name>/<version>/<name>.hpi`
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformConfig {
    /// Highest core version the target installation provides; no gate when
    /// absent
    pub max_core_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Bundles are written as `<stem>-1.zip`, `<stem>-2.zip`, ...
    #[serde(default = "default_stem")]
    pub stem: String,
    #[serde(default = "default_max_bundle_bytes")]
    pub max_bundle_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    pub version: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read config {}: {e}", path.display()))
        })?;
        toml::from_str(&data).map_err(|e| {
            Error::InitError(format!("Failed to parse config {}: {e}", path.display()))
        })
    }

    /// The requested plugin references, in listed order
    pub fn requested(&self) -> Vec<PluginRef> {
        self.plugins
            .iter()
            .map(|p| PluginRef::new(&p.name, &p.version))
            .collect()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            stem: default_stem(),
            max_bundle_bytes: default_max_bundle_bytes(),
        }
    }
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bundles")
}

fn default_stem() -> String {
    "plugins".to_string()
}

fn default_max_bundle_bytes() -> u64 {
    DEFAULT_MAX_BUNDLE_BYTES
}
