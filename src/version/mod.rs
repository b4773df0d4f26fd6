// src/version/mod.rs

//! Version parsing and comparison for registry plugin versions
//!
//! Plugin versions published to the update center are frequently not
//! semver-conformant: two-component versions like `1.30`, or versions with
//! commit-hash suffixes like `590.v6a_d052e5a_a_b_5`. This module parses
//! them into a totally ordered form so that "latest wins" comparisons are
//! well defined for every version string the registry serves.

use crate::error::{Error, Result};
use semver::Version;
use std::cmp::Ordering;
use std::fmt;

/// A parsed plugin version
///
/// Parsing tries the standard semver grammar first. When that fails, the
/// fallback takes the longest leading dotted-numeric run as the release
/// components (`1.199.v3ce31253ed13` compares as `1.199`) and keeps the
/// remainder as an ordering qualifier. A version with no leading numeric
/// component at all does not parse.
///
/// Ordering compares release components most significant first (missing
/// components count as zero); on equal releases a version without a
/// qualifier ranks above one with a qualifier, mirroring how semver treats
/// pre-release tags.
#[derive(Debug, Clone)]
pub struct PluginVersion {
    /// Numeric release components, trailing zeros normalized away
    release: Vec<u64>,
    /// Trailing qualifier (pre-release tag or registry suffix), may be empty
    qualifier: String,
    /// Original string, kept for display
    raw: String,
}

impl PluginVersion {
    /// Parse a registry version string
    ///
    /// Examples:
    /// - "2.387.3" → release [2, 387, 3]
    /// - "1.30" → release [1, 30]
    /// - "590.v6a_d052e5a_a_b_5" → release [590], qualifier "v6a_d052e5a_a_b_5"
    /// - "2.0.0-beta.1" → release [2], qualifier "beta.1"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidVersion {
                version: s.to_string(),
                reason: "empty version string".to_string(),
            });
        }

        if let Ok(v) = Version::parse(s) {
            let mut release = vec![v.major, v.minor, v.patch];
            normalize(&mut release);
            return Ok(Self {
                release,
                qualifier: v.pre.as_str().to_string(),
                raw: s.to_string(),
            });
        }

        Self::parse_fallback(s)
    }

    /// Minimum sentinel, used where a plugin declares no core requirement
    pub fn zero() -> Self {
        Self {
            release: vec![0],
            qualifier: String::new(),
            raw: "0".to_string(),
        }
    }

    /// Fallback for versions the standard grammar rejects
    ///
    /// Consumes the longest leading dotted-numeric run; a dot is only
    /// consumed when digits follow it, so the run ends at the first
    /// non-numeric path component rather than at the first non-digit byte.
    fn parse_fallback(s: &str) -> Result<Self> {
        let mut release = Vec::new();
        let mut rest = s;

        loop {
            let digit_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digit_end == 0 {
                break;
            }
            let component = rest[..digit_end].parse::<u64>().map_err(|e| {
                Error::InvalidVersion {
                    version: s.to_string(),
                    reason: format!("numeric component out of range: {e}"),
                }
            })?;
            release.push(component);
            rest = &rest[digit_end..];

            match rest.strip_prefix('.') {
                Some(after) if after.starts_with(|c: char| c.is_ascii_digit()) => rest = after,
                _ => break,
            }
        }

        if release.is_empty() {
            return Err(Error::InvalidVersion {
                version: s.to_string(),
                reason: "no leading numeric component".to_string(),
            });
        }

        normalize(&mut release);
        let qualifier = rest.trim_start_matches(['.', '-', '_']).to_string();

        Ok(Self {
            release,
            qualifier,
            raw: s.to_string(),
        })
    }

    /// Compare two plugin versions
    pub fn compare(&self, other: &PluginVersion) -> Ordering {
        match self.release.cmp(&other.release) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match (self.qualifier.is_empty(), other.qualifier.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.qualifier.cmp(&other.qualifier),
        }
    }

    /// The original version string
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Trim trailing zero components so "1.0" and "1.0.0" compare equal
/// under plain slice ordering
fn normalize(release: &mut Vec<u64>) {
    while release.len() > 1 && release.last() == Some(&0) {
        release.pop();
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for PluginVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for PluginVersion {}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
