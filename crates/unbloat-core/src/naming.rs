//! File naming conventions for downloaded and rewritten support packages.

use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};

/// Prefix of a rewritten package's file name.
pub const UNBLOATED_PREFIX: &str = "unbloat-";

/// `{host}_{YYYYmmddHHMMSS}.tar.gz`, the name a freshly fetched package is stored under.
pub fn package_file_name<Tz>(host: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.tar.gz", host, at.format("%Y%m%d%H%M%S"))
}

/// Sibling path for the rewritten copy of `path`: `dir/unbloat-{stem}{.ext}`.
///
/// Only the last extension is split off, so `pkg.tar.gz` becomes
/// `unbloat-pkg.tar.gz`.
pub fn unbloated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", UNBLOATED_PREFIX, stem, ext.to_string_lossy()),
        None => format!("{}{}", UNBLOATED_PREFIX, stem),
    };
    path.with_file_name(name)
}
