// src/manifest/mod.rs

//! Plugin manifest parsing
//!
//! A plugin binary embeds its metadata as a flat attribute block: each
//! `Name: value` line opens an attribute, and a line that does not match
//! that shape continues the value of the most recently opened attribute
//! (trimmed, appended without a separator). Blank lines are skipped.
//!
//! Beyond raw attribute access, this module extracts the pieces resolution
//! cares about: the declared dependency list, the required core version,
//! and a human-facing display name.

use crate::error::{Error, Result};
use crate::resolver::PluginRef;
use crate::version::PluginVersion;
use std::collections::HashMap;

/// Attribute carrying the comma-separated dependency declarations
const DEPENDENCIES_ATTRIBUTE: &str = "Plugin-Dependencies";

/// Attribute carrying the minimum core version the plugin needs
const CORE_VERSION_ATTRIBUTE: &str = "Jenkins-Version";

/// Brand prefix stripped from long display names
const BRAND_PREFIX: &str = "Jenkins ";

/// Parsed manifest attribute block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    attributes: HashMap<String, String>,
}

impl Manifest {
    /// Parse raw manifest bytes into an attribute mapping
    ///
    /// Fails when the bytes are not valid UTF-8 or when a continuation line
    /// appears before any attribute has been opened.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::InvalidManifest(format!("not valid UTF-8: {e}")))?;

        let mut attributes: HashMap<String, String> = HashMap::new();
        let mut current: Option<String> = None;

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some((name, value)) = line.split_once(": ") {
                attributes.insert(name.to_string(), value.trim().to_string());
                current = Some(name.to_string());
            } else {
                let Some(name) = current.as_deref() else {
                    return Err(Error::InvalidManifest(format!(
                        "continuation line before any attribute: '{}'",
                        line.trim()
                    )));
                };
                if let Some(value) = attributes.get_mut(name) {
                    value.push_str(line.trim());
                }
            }
        }

        Ok(Self { attributes })
    }

    /// Look up a raw attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Dependency declarations, in declared order
    ///
    /// The attribute value is a comma-separated list of `name:version`
    /// entries; a `;`-delimited qualifier suffix (e.g. `;resolution:=optional`)
    /// is discarded. An absent attribute means no dependencies.
    pub fn plugin_dependencies(&self) -> Result<Vec<PluginRef>> {
        let Some(raw) = self.get(DEPENDENCIES_ATTRIBUTE) else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(|entry| {
                let entry = entry.split(';').next().unwrap_or(entry).trim();
                match entry.split_once(':') {
                    Some((name, version))
                        if !name.is_empty() && !version.is_empty() && !version.contains(':') =>
                    {
                        Ok(PluginRef::new(name, version))
                    }
                    _ => Err(Error::InvalidManifest(format!(
                        "malformed dependency entry '{entry}'"
                    ))),
                }
            })
            .collect()
    }

    /// Minimum core version this plugin declares, or the zero sentinel
    /// when the attribute is absent
    pub fn core_requirement(&self) -> Result<PluginVersion> {
        match self.get(CORE_VERSION_ATTRIBUTE) {
            Some(value) => PluginVersion::parse(value),
            None => Ok(PluginVersion::zero()),
        }
    }

    /// Human-facing plugin name
    ///
    /// Prefers the long name with the brand prefix stripped, then the short
    /// name, then the caller-supplied bare identifier. Display-only.
    pub fn display_name(&self, fallback: &str) -> String {
        if let Some(long) = self.get("Long-Name") {
            return long.strip_prefix(BRAND_PREFIX).unwrap_or(long).to_string();
        }
        if let Some(short) = self.get("Short-Name") {
            return short.to_string();
        }
        fallback.to_string()
    }
}
