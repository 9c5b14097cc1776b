//! The archive rewriting engine.
//!
//! One routine ([`Rewriter::rewrite_members`]) walks a source archive and
//! writes the retained members to a sink:
//!
//! 1. `*.gz` members (nested archives) are dropped.
//! 2. Members named in the exclusion set are dropped.
//! 3. Hard and symbolic links take the content of the earlier retained
//!    member they point at; unresolved links, directories and other
//!    content-less entries are dropped. Unknown entry types count as files.
//! 4. `*.log` members that decode as UTF-8 keep only their last
//!    `tail_lines` lines; undecodable ones pass through with a warning.
//! 5. Everything else is copied byte-for-byte, in source order.
//!
//! [`Rewriter::rewrite_file`] and [`Rewriter::rewrite_bytes`] are thin
//! adapters over [`Rewriter::rewrite_stream`] that add size accounting.
//! All sizes are raw byte counts in both modes.

use crate::archive::{
    ArchiveSink, ArchiveSource, Codec, MemberHeader, MemberKind, TarGzSink, TarSource,
};
use crate::config::RewriteConfig;
use crate::error::{ErrorKind, Result, RewriteError};
use crate::io::CountingWriter;
use crate::links::LinkTargets;
use crate::stats::{EncodingWarning, MemberStats, SizeStats};
use crate::tail;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Members with this suffix are nested archives and never copied.
pub const NESTED_ARCHIVE_SUFFIX: &str = ".gz";
/// Members with this suffix are tail-truncated.
pub const LOG_SUFFIX: &str = ".log";

/// Upper bound on the up-front allocation for a member; larger members grow
/// the buffer as they are read.
const MAX_PREALLOC_BYTES: u64 = 16 * 1024 * 1024;

/// Outcome of walking the members of one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberReport {
    pub members: MemberStats,
    pub warnings: Vec<EncodingWarning>,
}

/// Result of [`Rewriter::rewrite_stream`].
#[derive(Debug)]
pub struct StreamRewrite<W> {
    pub codec: Codec,
    pub report: MemberReport,
    /// Bytes of compressed output handed to the writer.
    pub bytes_written: u64,
    pub writer: W,
}

/// Result of [`Rewriter::rewrite_bytes`].
#[derive(Debug, Clone)]
pub struct BufferRewrite {
    pub sizes: SizeStats,
    pub codec: Codec,
    pub report: MemberReport,
    pub output: Vec<u8>,
}

/// Result of [`Rewriter::rewrite_file`].
#[derive(Debug, Clone)]
pub struct FileRewrite {
    pub sizes: SizeStats,
    pub codec: Codec,
    pub report: MemberReport,
    pub destination: PathBuf,
}

/// Shrinks support package archives.
///
/// Holds only immutable configuration, so one instance can serve any number
/// of concurrent calls on independent archives.
///
/// # Example
///
/// ```no_run
/// use unbloat_core::{RewriteConfig, Rewriter};
/// use std::path::Path;
///
/// let config = RewriteConfig::default().with_exclusions(["node1/ccs-redis.rdb"]);
/// let rewriter = Rewriter::new(config).unwrap();
/// let result = rewriter
///     .rewrite_file(Path::new("debuginfo.tar.gz"), Path::new("unbloat-debuginfo.tar.gz"))
///     .unwrap();
/// println!("saved {} bytes", result.sizes.savings_bytes());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    config: RewriteConfig,
}

impl Rewriter {
    pub fn new(config: RewriteConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite the archive at `source` into a gzip-compressed tar at
    /// `destination`.
    ///
    /// Output is staged next to `destination` and moved into place only on
    /// success; a failed call leaves no destination file behind and does not
    /// touch an existing one.
    pub fn rewrite_file(&self, source: &Path, destination: &Path) -> Result<FileRewrite> {
        let file = File::open(source)
            .map_err(|e| RewriteError::from(e).with_context(format!("open {}", source.display())))?;
        let original_bytes = file
            .metadata()
            .map_err(|e| RewriteError::from(e).with_context(format!("stat {}", source.display())))?
            .len();

        let staged = stage_destination(destination)?;
        let out = self.rewrite_stream(BufReader::new(file), BufWriter::new(staged))?;

        let staged = out.writer.into_inner().map_err(|e| {
            RewriteError::from(e.into_error())
                .with_context(format!("write {}", destination.display()))
        })?;
        staged.as_file().sync_all()?;
        let new_bytes = staged.as_file().metadata()?.len();
        staged.persist(destination).map_err(|e| {
            RewriteError::from(e.error).with_context(format!("persist {}", destination.display()))
        })?;

        let sizes = SizeStats::new(original_bytes, new_bytes);
        log_summary(&sizes, &out.report);
        Ok(FileRewrite {
            sizes,
            codec: out.codec,
            report: out.report,
            destination: destination.to_path_buf(),
        })
    }

    /// Rewrite an in-memory archive. No filesystem access.
    pub fn rewrite_bytes(&self, source: &[u8]) -> Result<BufferRewrite> {
        let out = self.rewrite_stream(Cursor::new(source), Vec::new())?;
        let sizes = SizeStats::new(source.len() as u64, out.writer.len() as u64);
        log_summary(&sizes, &out.report);
        Ok(BufferRewrite {
            sizes,
            codec: out.codec,
            report: out.report,
            output: out.writer,
        })
    }

    /// Rewrite from any reader into any writer. The writer receives a
    /// complete tar.gz stream and is flushed before being returned.
    pub fn rewrite_stream<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<StreamRewrite<W>> {
        let mut source = TarSource::open(reader)?;
        let mut sink = TarGzSink::new(CountingWriter::new(writer));
        let report = self.rewrite_members(&mut source, &mut sink)?;

        let mut counting = sink.finish()?;
        counting.flush()?;
        Ok(StreamRewrite {
            codec: source.codec(),
            report,
            bytes_written: counting.written(),
            writer: counting.into_inner(),
        })
    }

    /// Copy retained members from `source` to `sink`. The sink is left open;
    /// finishing it is the caller's job.
    pub fn rewrite_members<S, K>(&self, source: &mut S, sink: &mut K) -> Result<MemberReport>
    where
        S: ArchiveSource + ?Sized,
        K: ArchiveSink,
    {
        let mut report = MemberReport::default();
        let mut targets = LinkTargets::default();

        source.for_each_member(&mut |header, content| {
            let stats = &mut report.members;
            stats.seen += 1;
            let name = header.name.as_str();

            if name.ends_with(NESTED_ARCHIVE_SUFFIX) {
                tracing::debug!(member = %name, "skipping nested archive");
                stats.nested_archives += 1;
                return Ok(());
            }
            if self.config.is_excluded(name) {
                tracing::debug!(member = %name, "skipping excluded member");
                stats.excluded += 1;
                return Ok(());
            }

            let data = match header.kind {
                MemberKind::File => {
                    let data = self.read_member(header, content)?;
                    targets.remember(name, &data);
                    data
                }
                MemberKind::HardLink | MemberKind::Symlink => {
                    let target = header.link_target.as_deref().unwrap_or_default();
                    let resolved = if header.kind == MemberKind::HardLink {
                        targets.hard_link(target)
                    } else {
                        targets.symlink(name, target)
                    };
                    let Some(found) = resolved.map(<[u8]>::to_vec) else {
                        tracing::warn!(
                            member = %name,
                            target = %target,
                            "link target is not an earlier retained member; dropping link"
                        );
                        stats.non_file += 1;
                        return Ok(());
                    };
                    tracing::debug!(member = %name, target = %target, "resolved link");
                    stats.links_resolved += 1;
                    targets.remember(name, &found);
                    found
                }
                MemberKind::Directory | MemberKind::Other => {
                    tracing::debug!(member = %name, kind = ?header.kind, "skipping non-file entry");
                    stats.non_file += 1;
                    return Ok(());
                }
            };

            let mut body: &[u8] = &data;
            if name.ends_with(LOG_SUFFIX) {
                match std::str::from_utf8(&data) {
                    Ok(_) => {
                        if let Some(tail) = tail::tail_lines(&data, self.config.tail_lines) {
                            tracing::debug!(
                                member = %name,
                                from_bytes = data.len(),
                                to_bytes = tail.len(),
                                "truncated log"
                            );
                            stats.truncated += 1;
                            body = tail;
                        }
                    }
                    Err(e) => {
                        let warning = EncodingWarning {
                            member: name.to_string(),
                            valid_up_to: e.valid_up_to(),
                        };
                        tracing::warn!(member = %name, "{}", warning);
                        report.warnings.push(warning);
                    }
                }
            }

            sink.add_member(name, body)?;
            report.members.kept += 1;
            Ok(())
        })?;

        Ok(report)
    }

    /// Read a regular member in full, enforcing the size limit before and
    /// the declared size after reading.
    fn read_member(&self, header: &MemberHeader, content: &mut dyn Read) -> Result<Vec<u8>> {
        let name = header.name.as_str();
        if let Some(max) = self.config.max_member_bytes {
            if header.size > max {
                return Err(RewriteError::new(
                    ErrorKind::Limit,
                    format!(
                        "member '{}' declared size {} exceeds limit {}",
                        name, header.size, max
                    ),
                ));
            }
        }

        let mut data = Vec::with_capacity(header.size.min(MAX_PREALLOC_BYTES) as usize);
        content.read_to_end(&mut data).map_err(|e| {
            RewriteError::from_source_stream(e).with_context(format!("read '{}'", name))
        })?;
        if (data.len() as u64) < header.size {
            return Err(RewriteError::format(format!(
                "member '{}' is truncated: declared {} bytes, read {}",
                name,
                header.size,
                data.len()
            )));
        }
        Ok(data)
    }
}

fn stage_destination(destination: &Path) -> Result<tempfile::NamedTempFile> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".unbloat-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| {
            RewriteError::from(e).with_context(format!("create staging file in {}", dir.display()))
        })
}

fn log_summary(sizes: &SizeStats, report: &MemberReport) {
    tracing::info!(
        original_bytes = sizes.original_bytes(),
        new_bytes = sizes.new_bytes(),
        savings_bytes = sizes.savings_bytes(),
        kept = report.members.kept,
        truncated = report.members.truncated,
        warnings = report.warnings.len(),
        "archive rewritten"
    );
}
