// src/resolver/mod.rs

//! Transitive plugin dependency resolution
//!
//! Builds the full dependency closure for a set of requested plugins.
//! Resolution is depth-first in request order and memoized by plugin name,
//! so cyclic and diamond-shaped dependency declarations terminate: the
//! second encounter of a name never re-fetches and never re-descends, it
//! only reconciles versions (highest requested version wins).
//!
//! At most one [`ResolvedPlugin`] exists per name for the lifetime of a
//! resolution run. When a later request carries a higher version, the
//! existing node's version is bumped in place and an upgrade notice is
//! recorded; the node's manifest and dependency edges remain those of the
//! version resolved first.

use crate::error::Result;
use crate::manifest::Manifest;
use crate::version::PluginVersion;
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Write as _};
use tracing::{debug, info};

/// A `name:version` plugin request, from the caller or from a manifest
/// dependency declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRef {
    pub name: String,
    pub version: String,
}

impl PluginRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// The authoritative node for one plugin name within a resolution run
#[derive(Debug, Clone)]
pub struct ResolvedPlugin {
    pub name: String,
    /// Highest version requested so far; may be bumped after construction
    pub version: String,
    /// Manifest of the version resolved first; not re-fetched on bumps
    pub manifest: Manifest,
    /// Dependency declarations extracted from `manifest`, in declared order
    pub dependencies: Vec<PluginRef>,
}

impl ResolvedPlugin {
    /// Human-facing name, falling back to the bare identifier
    pub fn display_name(&self) -> String {
        self.manifest.display_name(&self.name)
    }
}

/// Upgrade notice recorded when a later request bumps a resolved plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeNotice {
    pub name: String,
    pub from: String,
    pub to: String,
}

impl fmt::Display for UpgradeNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found new version of {}: {} was {}",
            self.name, self.to, self.from
        )
    }
}

/// Source of plugin manifests during a resolution run
pub trait ManifestSource {
    fn manifest(&mut self, name: &str, version: &str) -> Result<Manifest>;
}

/// Output of one resolution run
///
/// Immutable after construction; consumed by the core-version gate and the
/// bundler. The map is keyed by plugin name, so iteration is name-ordered.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub plugins: BTreeMap<String, ResolvedPlugin>,
    /// Version bumps observed, in traversal order
    pub notices: Vec<UpgradeNotice>,
}

impl Resolution {
    pub fn get(&self, name: &str) -> Option<&ResolvedPlugin> {
        self.plugins.get(name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Render an indented dependency forest, one tree per requested plugin
    ///
    /// A node already printed earlier in the same pass renders as an
    /// "already shown" marker instead of re-descending, which bounds the
    /// output to the number of distinct nodes even when the underlying
    /// graph has diamond sharing. Each call starts a fresh pass.
    pub fn render_forest(&self, requested: &[PluginRef]) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        for req in requested {
            self.render_node(&req.name, 0, &mut seen, &mut out);
        }
        out
    }

    fn render_node(&self, name: &str, depth: usize, seen: &mut HashSet<String>, out: &mut String) {
        let Some(node) = self.plugins.get(name) else {
            return;
        };

        let indent = "  ".repeat(depth);
        if !seen.insert(name.to_string()) {
            let _ = writeln!(out, "{indent}{}:{} (already shown)", node.name, node.version);
            return;
        }

        let _ = writeln!(out, "{indent}{}:{}", node.name, node.version);
        for dep in &node.dependencies {
            self.render_node(&dep.name, depth + 1, seen, out);
        }
    }
}

/// Depth-first, name-memoized dependency resolver
pub struct Resolver<'a, S: ManifestSource> {
    source: &'a mut S,
    plugins: BTreeMap<String, ResolvedPlugin>,
    notices: Vec<UpgradeNotice>,
}

impl<'a, S: ManifestSource> Resolver<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self {
            source,
            plugins: BTreeMap::new(),
            notices: Vec::new(),
        }
    }

    /// Resolve the requested plugins and their transitive closures
    ///
    /// Any version, manifest, container, or download error is fatal to the
    /// run; there is no partial-success mode.
    pub fn resolve(mut self, requested: &[PluginRef]) -> Result<Resolution> {
        for req in requested {
            self.visit(req)?;
        }

        info!("Resolved {} plugins", self.plugins.len());
        Ok(Resolution {
            plugins: self.plugins,
            notices: self.notices,
        })
    }

    fn visit(&mut self, req: &PluginRef) -> Result<()> {
        if let Some(existing) = self.plugins.get_mut(&req.name) {
            let current = PluginVersion::parse(&existing.version)?;
            let requested = PluginVersion::parse(&req.version)?;
            if requested > current {
                info!(
                    "Found new version of {}: {} was {}",
                    req.name, req.version, existing.version
                );
                self.notices.push(UpgradeNotice {
                    name: req.name.clone(),
                    from: existing.version.clone(),
                    to: req.version.clone(),
                });
                existing.version = req.version.clone();
            }
            return Ok(());
        }

        debug!("Resolving {}", req);
        let manifest = self.source.manifest(&req.name, &req.version)?;
        let dependencies = manifest.plugin_dependencies()?;

        // Insert before descending so a cyclic declaration short-circuits
        // into the version-comparison branch above
        self.plugins.insert(
            req.name.clone(),
            ResolvedPlugin {
                name: req.name.clone(),
                version: req.version.clone(),
                manifest,
                dependencies: dependencies.clone(),
            },
        );

        for dep in &dependencies {
            self.visit(dep)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    /// In-memory manifest source for resolver tests
    struct MapSource {
        manifests: HashMap<(String, String), Manifest>,
    }

    impl MapSource {
        fn new() -> Self {
            Self {
                manifests: HashMap::new(),
            }
        }

        fn insert(&mut self, name: &str, version: &str, manifest_text: &str) {
            self.manifests.insert(
                (name.to_string(), version.to_string()),
                Manifest::parse(manifest_text.as_bytes()).unwrap(),
            );
        }
    }

    impl ManifestSource for MapSource {
        fn manifest(&mut self, name: &str, version: &str) -> Result<Manifest> {
            self.manifests
                .get(&(name.to_string(), version.to_string()))
                .cloned()
                .ok_or_else(|| {
                    Error::DownloadError(format!("no such plugin {name} {version}"))
                })
        }
    }

    fn resolve(source: &mut MapSource, requested: &[PluginRef]) -> Resolution {
        Resolver::new(source).resolve(requested).unwrap()
    }

    #[test]
    fn test_resolve_single_plugin() {
        let mut source = MapSource::new();
        source.insert("git", "5.0.2", "Short-Name: git\n");

        let resolution = resolve(&mut source, &[PluginRef::new("git", "5.0.2")]);
        assert_eq!(resolution.len(), 1);
        assert_eq!(resolution.get("git").unwrap().version, "5.0.2");
        assert!(resolution.notices.is_empty());
    }

    #[test]
    fn test_resolve_transitive_chain() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: b:1.0\n");
        source.insert("b", "1.0", "Plugin-Dependencies: c:1.0\n");
        source.insert("c", "1.0", "Short-Name: c\n");

        let resolution = resolve(&mut source, &[PluginRef::new("a", "1.0")]);
        assert_eq!(resolution.len(), 3);
        assert!(resolution.get("c").is_some());
    }

    #[test]
    fn test_diamond_produces_single_node() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: b:1.0,c:1.0\n");
        source.insert("b", "1.0", "Plugin-Dependencies: d:1.0\n");
        source.insert("c", "1.0", "Plugin-Dependencies: d:1.0\n");
        source.insert("d", "1.0", "Short-Name: d\n");

        let resolution = resolve(&mut source, &[PluginRef::new("a", "1.0")]);
        assert_eq!(resolution.len(), 4);
    }

    #[test]
    fn test_higher_version_wins_with_notice() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: c:1\n");
        source.insert("b", "1.0", "Plugin-Dependencies: c:2\n");
        source.insert("c", "1", "Short-Name: c\n");

        let resolution = resolve(
            &mut source,
            &[PluginRef::new("a", "1.0"), PluginRef::new("b", "1.0")],
        );

        assert_eq!(resolution.get("c").unwrap().version, "2");
        assert_eq!(
            resolution.notices,
            vec![UpgradeNotice {
                name: "c".to_string(),
                from: "1".to_string(),
                to: "2".to_string(),
            }]
        );
    }

    #[test]
    fn test_lower_version_ignored_without_notice() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: c:2\n");
        source.insert("b", "1.0", "Plugin-Dependencies: c:1\n");
        source.insert("c", "2", "Short-Name: c\n");

        let resolution = resolve(
            &mut source,
            &[PluginRef::new("a", "1.0"), PluginRef::new("b", "1.0")],
        );

        assert_eq!(resolution.get("c").unwrap().version, "2");
        assert!(resolution.notices.is_empty());
    }

    #[test]
    fn test_bump_does_not_refetch_dependencies() {
        // The node keeps the edges of the version resolved first, even
        // after its version is bumped
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: c:1\n");
        source.insert("b", "1.0", "Plugin-Dependencies: c:2\n");
        source.insert("c", "1", "Plugin-Dependencies: old-dep:1.0\n");
        source.insert("c", "2", "Plugin-Dependencies: new-dep:1.0\n");
        source.insert("old-dep", "1.0", "Short-Name: old-dep\n");
        source.insert("new-dep", "1.0", "Short-Name: new-dep\n");

        let resolution = resolve(
            &mut source,
            &[PluginRef::new("a", "1.0"), PluginRef::new("b", "1.0")],
        );

        let c = resolution.get("c").unwrap();
        assert_eq!(c.version, "2");
        assert_eq!(c.dependencies, vec![PluginRef::new("old-dep", "1.0")]);
        assert!(resolution.get("old-dep").is_some());
        assert!(resolution.get("new-dep").is_none());
    }

    #[test]
    fn test_cyclic_declarations_terminate() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: b:1.0\n");
        source.insert("b", "1.0", "Plugin-Dependencies: a:1.0\n");

        let resolution = resolve(&mut source, &[PluginRef::new("a", "1.0")]);
        assert_eq!(resolution.len(), 2);
    }

    #[test]
    fn test_missing_dependency_is_fatal() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: ghost:1.0\n");

        let result = Resolver::new(&mut source).resolve(&[PluginRef::new("a", "1.0")]);
        assert!(matches!(result, Err(Error::DownloadError(_))));
    }

    #[test]
    fn test_malformed_version_is_fatal() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: c:1\n");
        source.insert("b", "1.0", "Plugin-Dependencies: c:snapshot\n");
        source.insert("c", "1", "Short-Name: c\n");

        let result = Resolver::new(&mut source).resolve(&[
            PluginRef::new("a", "1.0"),
            PluginRef::new("b", "1.0"),
        ]);
        assert!(matches!(result, Err(Error::InvalidVersion { .. })));
    }

    #[test]
    fn test_render_forest_marks_shared_subtree() {
        let mut source = MapSource::new();
        source.insert("a", "1.0", "Plugin-Dependencies: common:1.0\n");
        source.insert("b", "1.0", "Plugin-Dependencies: common:1.0\n");
        source.insert("common", "1.0", "Plugin-Dependencies: leaf:1.0\n");
        source.insert("leaf", "1.0", "Short-Name: leaf\n");

        let requested = vec![PluginRef::new("a", "1.0"), PluginRef::new("b", "1.0")];
        let resolution = resolve(&mut source, &requested);
        let forest = resolution.render_forest(&requested);

        assert_eq!(
            forest,
            "a:1.0\n  common:1.0\n    leaf:1.0\nb:1.0\n  common:1.0 (already shown)\n"
        );

        // A new pass starts from a clean visited set
        assert_eq!(forest, resolution.render_forest(&requested));
    }
}
