// src/bundle/mod.rs

//! Offline bundle packaging
//!
//! Packs resolved plugin binaries into one or more zip bundles, each capped
//! at a configured byte budget. Plugins are packed in name order so bundle
//! contents are deterministic regardless of resolution order. A bundle is
//! closed when the next plugin would push it over the cap; a plugin larger
//! than the cap on its own still ships, alone in its own bundle, never
//! split and never dropped.

use crate::error::{Error, Result};
use crate::resolver::Resolution;
use crate::store::PluginStore;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Default bundle size cap (100 MiB)
pub const DEFAULT_MAX_BUNDLE_BYTES: u64 = 100 * 1024 * 1024;

/// One packed plugin, recorded for reporting
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub plugin: String,
    pub source: PathBuf,
    pub size: u64,
}

/// A finished bundle on disk
#[derive(Debug, Clone)]
pub struct Bundle {
    pub path: PathBuf,
    pub entries: Vec<BundleEntry>,
    pub total_bytes: u64,
}

/// Size-capped zip packer over a resolved plugin set
pub struct Bundler {
    output_dir: PathBuf,
    stem: String,
    max_bytes: u64,
}

impl Bundler {
    pub fn new(output_dir: impl Into<PathBuf>, stem: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            stem: stem.into(),
            max_bytes,
        }
    }

    /// Pack every resolved plugin into numbered bundles
    ///
    /// Fetches each plugin binary through the store first (a version bumped
    /// during resolution may not be cached yet), then fills bundles in name
    /// order. Bundles are numbered `<stem>-1.zip`, `<stem>-2.zip`, ...
    pub fn pack(&self, resolution: &Resolution, store: &PluginStore) -> Result<Vec<Bundle>> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create output directory {}: {e}",
                self.output_dir.display()
            ))
        })?;

        // BTreeMap iteration is already name-ordered
        let mut entries = Vec::new();
        for plugin in resolution.plugins.values() {
            let source = store.fetch(&plugin.name, &plugin.version)?;
            let size = store.size_of(&plugin.name, &plugin.version)?;
            entries.push(BundleEntry {
                plugin: plugin.name.clone(),
                source,
                size,
            });
        }

        let mut bundles = Vec::new();
        let mut current: Vec<BundleEntry> = Vec::new();
        let mut current_bytes = 0u64;

        for entry in entries {
            if !current.is_empty() && current_bytes + entry.size > self.max_bytes {
                bundles.push(self.write_bundle(bundles.len() + 1, std::mem::take(&mut current))?);
                current_bytes = 0;
            }
            current_bytes += entry.size;
            current.push(entry);
        }
        if !current.is_empty() {
            bundles.push(self.write_bundle(bundles.len() + 1, current)?);
        }

        info!(
            "Packed {} plugins into {} bundle(s)",
            resolution.len(),
            bundles.len()
        );
        Ok(bundles)
    }

    fn bundle_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("{}-{index}.zip", self.stem))
    }

    fn write_bundle(&self, index: usize, entries: Vec<BundleEntry>) -> Result<Bundle> {
        let path = self.bundle_path(index);
        let file = File::create(&path)
            .map_err(|e| Error::IoError(format!("Failed to create {}: {e}", path.display())))?;
        let mut writer = ZipWriter::new(file);

        // Plugin payloads are already deflated; store them as-is
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let mut total_bytes = 0u64;
        for entry in &entries {
            debug!("Adding {} ({} bytes) to {}", entry.plugin, entry.size, path.display());
            writer
                .start_file(format!("{}.hpi", entry.plugin), options)
                .map_err(|e| {
                    Error::IoError(format!("Failed to add {} to bundle: {e}", entry.plugin))
                })?;
            let bytes = fs::read(&entry.source).map_err(|e| {
                Error::IoError(format!("Failed to read {}: {e}", entry.source.display()))
            })?;
            writer.write_all(&bytes).map_err(|e| {
                Error::IoError(format!("Failed to write {} to bundle: {e}", entry.plugin))
            })?;
            total_bytes += entry.size;
        }

        writer
            .finish()
            .map_err(|e| Error::IoError(format!("Failed to finalize {}: {e}", path.display())))?;

        info!(
            "Wrote {} ({} plugins, {} bytes)",
            path.display(),
            entries.len(),
            total_bytes
        );
        Ok(Bundle {
            path,
            entries,
            total_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::resolver::ResolvedPlugin;
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;

    /// Seed a cache entry of an exact byte size; the packer treats plugin
    /// payloads as opaque bytes
    fn seed_sized(cache: &Path, name: &str, version: &str, size: usize) {
        fs::write(cache.join(format!("{name}_{version}.hpi")), vec![0u8; size]).unwrap();
    }

    fn resolution_of(names: &[&str]) -> Resolution {
        Resolution {
            plugins: names
                .iter()
                .map(|name| {
                    (
                        name.to_string(),
                        ResolvedPlugin {
                            name: name.to_string(),
                            version: "1.0".to_string(),
                            manifest: Manifest::default(),
                            dependencies: Vec::new(),
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
            notices: Vec::new(),
        }
    }

    fn store_at(cache: &Path) -> PluginStore {
        PluginStore::new(cache, "http://registry.invalid/plugins").unwrap()
    }

    fn entry_names(bundle: &Bundle) -> Vec<String> {
        let file = File::open(&bundle.path).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_everything_fits_in_one_bundle() {
        let temp = TempDir::new().unwrap();
        seed_sized(temp.path(), "a", "1.0", 10);
        seed_sized(temp.path(), "b", "1.0", 20);

        let store = store_at(temp.path());
        let bundler = Bundler::new(temp.path().join("out"), "plugins", 100);
        let bundles = bundler.pack(&resolution_of(&["a", "b"]), &store).unwrap();

        assert_eq!(bundles.len(), 1);
        assert!(bundles[0].path.ends_with("plugins-1.zip"));
        assert_eq!(bundles[0].total_bytes, 30);
        assert_eq!(entry_names(&bundles[0]), vec!["a.hpi", "b.hpi"]);
    }

    #[test]
    fn test_overflow_closes_bundle() {
        // 60 + 60 overflows a 100-byte cap, so the second plugin opens a
        // new bundle and the third still fits beside it
        let temp = TempDir::new().unwrap();
        seed_sized(temp.path(), "a", "1.0", 60);
        seed_sized(temp.path(), "b", "1.0", 60);
        seed_sized(temp.path(), "c", "1.0", 10);

        let store = store_at(temp.path());
        let bundler = Bundler::new(temp.path().join("out"), "plugins", 100);
        let bundles = bundler
            .pack(&resolution_of(&["a", "b", "c"]), &store)
            .unwrap();

        assert_eq!(bundles.len(), 2);
        assert_eq!(entry_names(&bundles[0]), vec!["a.hpi"]);
        assert_eq!(entry_names(&bundles[1]), vec!["b.hpi", "c.hpi"]);
        assert_eq!(bundles[1].total_bytes, 70);
    }

    #[test]
    fn test_oversized_plugin_ships_alone() {
        let temp = TempDir::new().unwrap();
        seed_sized(temp.path(), "a", "1.0", 10);
        seed_sized(temp.path(), "big", "1.0", 150);
        seed_sized(temp.path(), "z", "1.0", 10);

        let store = store_at(temp.path());
        let bundler = Bundler::new(temp.path().join("out"), "plugins", 100);
        let bundles = bundler
            .pack(&resolution_of(&["a", "big", "z"]), &store)
            .unwrap();

        assert_eq!(bundles.len(), 3);
        assert_eq!(entry_names(&bundles[0]), vec!["a.hpi"]);
        assert_eq!(entry_names(&bundles[1]), vec!["big.hpi"]);
        assert_eq!(entry_names(&bundles[2]), vec!["z.hpi"]);
    }

    #[test]
    fn test_missing_cached_bytes_fail_packing() {
        let temp = TempDir::new().unwrap();

        let store = store_at(temp.path());
        let bundler = Bundler::new(temp.path().join("out"), "plugins", 100);
        // Nothing seeded and the registry is unreachable
        assert!(bundler.pack(&resolution_of(&["a"]), &store).is_err());
    }
}
