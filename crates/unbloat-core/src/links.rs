//! Link resolution against earlier members of the same archive.
//!
//! A hard link names its target directly; a symbolic link's target is
//! relative to the directory holding the link. Both are looked up after
//! lexical normalisation, and only among members that were already written.

use std::collections::HashMap;

/// Content cached for link resolution is capped; links to members beyond
/// the cap are left unresolved.
pub(crate) const LINK_TARGET_BUDGET_BYTES: usize = 64 * 1024 * 1024;

/// Contents of written members, keyed by normalised name.
pub(crate) struct LinkTargets {
    contents: HashMap<String, Vec<u8>>,
    held_bytes: usize,
    budget_bytes: usize,
}

impl Default for LinkTargets {
    fn default() -> Self {
        Self::with_budget(LINK_TARGET_BUDGET_BYTES)
    }
}

impl LinkTargets {
    pub(crate) fn with_budget(budget_bytes: usize) -> Self {
        Self {
            contents: HashMap::new(),
            held_bytes: 0,
            budget_bytes,
        }
    }

    /// Record `content` under `name`. A later member with the same name
    /// replaces the earlier one. Returns `false` when the budget is spent.
    pub(crate) fn remember(&mut self, name: &str, content: &[u8]) -> bool {
        let key = normalize(name);
        let replaced = self.contents.get(&key).map_or(0, Vec::len);
        let held = self.held_bytes - replaced + content.len();
        if held > self.budget_bytes {
            if self.contents.remove(&key).is_some() {
                self.held_bytes -= replaced;
            }
            tracing::debug!(member = %name, "link target cache full");
            return false;
        }
        self.held_bytes = held;
        self.contents.insert(key, content.to_vec());
        true
    }

    /// Content of the member a hard link points at.
    pub(crate) fn hard_link(&self, target: &str) -> Option<&[u8]> {
        self.contents.get(&normalize(target)).map(Vec::as_slice)
    }

    /// Content of the member a symbolic link named `name` points at.
    pub(crate) fn symlink(&self, name: &str, target: &str) -> Option<&[u8]> {
        let dir = name.rsplit_once('/').map_or("", |(dir, _)| dir);
        let joined = [dir, target]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        self.contents.get(&normalize(&joined)).map(Vec::as_slice)
    }
}

/// Lexical POSIX path normalisation: collapses `//` and `.`, folds `..`
/// into its parent and keeps a leading `/`.
pub(crate) fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
