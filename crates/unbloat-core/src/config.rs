//! Engine configuration and YAML overrides.

use crate::error::{Result, RewriteError};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Number of trailing lines kept from oversized `.log` members.
pub const DEFAULT_TAIL_LINES: usize = 500;

/// Immutable configuration of a [`crate::Rewriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Member names dropped verbatim (exact match, no globbing).
    pub exclusions: BTreeSet<String>,
    /// Lines kept from the end of each `.log` member.
    pub tail_lines: usize,
    /// Upper bound on a single retained member's size. `None` means unbounded.
    pub max_member_bytes: Option<u64>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            exclusions: BTreeSet::new(),
            tail_lines: DEFAULT_TAIL_LINES,
            max_member_bytes: None,
        }
    }
}

impl RewriteConfig {
    pub fn with_exclusions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_tail_lines(mut self, tail_lines: usize) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    pub fn with_max_member_bytes(mut self, max: u64) -> Self {
        self.max_member_bytes = Some(max);
        self
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tail_lines == 0 {
            return Err(RewriteError::config("tail_lines must be at least 1"));
        }
        if self.max_member_bytes == Some(0) {
            return Err(RewriteError::config("max_member_bytes must be at least 1"));
        }
        Ok(())
    }

    /// Apply overrides onto this configuration. Exclusions are unioned,
    /// scalar fields only override when `Some`.
    pub fn apply(mut self, overrides: RewriteConfigOverrides) -> Self {
        self.exclusions.extend(overrides.exclude);
        self.tail_lines = overrides.tail_lines.unwrap_or(self.tail_lines);
        self.max_member_bytes = overrides.max_member_bytes.or(self.max_member_bytes);
        self
    }
}

/// Partial configuration loaded from a YAML file.
/// Unknown keys cause deserialization to fail (deny_unknown_fields).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfigOverrides {
    #[serde(default)]
    pub exclude: Vec<String>,
    pub tail_lines: Option<usize>,
    pub max_member_bytes: Option<u64>,
}

impl RewriteConfigOverrides {
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RewriteError::config(e.to_string())
                .with_source(e)
                .with_context(format!("failed to read config {}", path.display()))
        })?;
        Self::from_yaml(&text)
            .map_err(|e| e.with_context(format!("invalid config {}", path.display())))
    }
}

/// Parse an exclusion list: one member name per line, blank lines and
/// `#` comments ignored. Names are not trimmed beyond the line ending so
/// that names with significant whitespace survive.
pub fn parse_exclusion_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(str::to_string)
        .collect()
}
