// src/compat.rs

//! Core version compatibility gate
//!
//! Every resolved plugin declares the minimum core version it needs. The
//! gate computes the set-wide maximum and, when a ceiling is configured,
//! collects every plugin whose individual requirement exceeds it. The full
//! report is produced before the caller decides whether the run fails, so
//! the diagnostics are actionable in one pass.

use crate::error::Result;
use crate::resolver::Resolution;
use crate::version::PluginVersion;
use std::fmt;
use tracing::info;

/// A plugin requiring a newer core than the configured ceiling
#[derive(Debug, Clone)]
pub struct CoreViolation {
    /// Display name of the offending plugin
    pub plugin: String,
    /// Core version the plugin requires
    pub required: PluginVersion,
}

impl fmt::Display for CoreViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires core {}", self.plugin, self.required)
    }
}

/// Outcome of the compatibility check over one resolved set
#[derive(Debug, Clone)]
pub struct CoreReport {
    /// Highest core version required across the resolved set
    pub highest: PluginVersion,
    /// Every plugin above the ceiling, in name order; empty when no
    /// ceiling was given or all plugins fit
    pub violations: Vec<CoreViolation>,
}

impl CoreReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check a resolved set against an optional core version ceiling
///
/// Violations are collected exhaustively rather than failing on the first
/// one. Fails only when a plugin's declared core version does not parse.
pub fn check_core_ceiling(
    resolution: &Resolution,
    ceiling: Option<&PluginVersion>,
) -> Result<CoreReport> {
    let mut highest = PluginVersion::zero();
    let mut violations = Vec::new();

    for plugin in resolution.plugins.values() {
        let required = plugin.manifest.core_requirement()?;
        if let Some(ceiling) = ceiling {
            if required > *ceiling {
                violations.push(CoreViolation {
                    plugin: plugin.display_name(),
                    required: required.clone(),
                });
            }
        }
        if required > highest {
            highest = required;
        }
    }

    info!("Highest required core version: {}", highest);
    Ok(CoreReport { highest, violations })
}
