use crate::cli::args::{OutputFormat, RewriteArgs};
use crate::exit_codes::EXIT_SUCCESS;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use unbloat_core::{
    package_file_name, parse_exclusion_list, unbloated_path, MemberReport,
    RewriteConfig, RewriteConfigOverrides, RewriteError, Rewriter, SizeStats,
};

/// Result of one `rewrite` invocation, as printed to stdout.
#[derive(Debug, Serialize)]
struct RewriteSummary {
    source: PathBuf,
    /// `None` when nothing was written (`--nosave`).
    output: Option<PathBuf>,
    mode: &'static str,
    sizes: SizeStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<MemberReport>,
}

pub fn run(args: RewriteArgs) -> Result<i32> {
    let config = build_config(&args)?;
    let rewriter = Rewriter::new(config)?;

    let summary = if args.bloat {
        copy_unchanged(&args)?
    } else if args.nosave {
        let source = read_source(&args.file)?;
        let result = rewriter
            .rewrite_bytes(&source)
            .with_context(|| format!("failed to rewrite {}", args.file.display()))?;
        RewriteSummary {
            source: args.file.clone(),
            output: None,
            mode: "nosave",
            sizes: result.sizes,
            report: Some(result.report),
        }
    } else if args.in_memory {
        let destination = resolve_output(&args)?;
        let source = read_source(&args.file)?;
        let result = rewriter
            .rewrite_bytes(&source)
            .with_context(|| format!("failed to rewrite {}", args.file.display()))?;
        save_bytes(&destination, &result.output)?;
        RewriteSummary {
            source: args.file.clone(),
            output: Some(destination),
            mode: "memory",
            sizes: result.sizes,
            report: Some(result.report),
        }
    } else {
        let destination = resolve_output(&args)?;
        let result = rewriter
            .rewrite_file(&args.file, &destination)
            .with_context(|| format!("failed to rewrite {}", args.file.display()))?;
        RewriteSummary {
            source: args.file.clone(),
            output: Some(result.destination),
            mode: "file",
            sizes: result.sizes,
            report: Some(result.report),
        }
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print!("{}", render_text(&summary)),
    }
    Ok(EXIT_SUCCESS)
}

/// Defaults, then the config file, then `--exclude-from`, then `--exclude`
/// and `--tail-lines`. Exclusions accumulate; the last tail setting wins.
fn build_config(args: &RewriteArgs) -> Result<RewriteConfig> {
    let mut config = RewriteConfig::default();
    if let Some(path) = &args.config {
        config = config.apply(RewriteConfigOverrides::load(path)?);
    }
    if let Some(path) = &args.exclude_from {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RewriteError::config(e.to_string())
                .with_source(e)
                .with_context(format!("failed to read exclusion list {}", path.display()))
        })?;
        config = config.with_exclusions(parse_exclusion_list(&text));
    }
    config = config.with_exclusions(args.exclude.iter().cloned());
    if let Some(tail_lines) = args.tail_lines {
        config = config.with_tail_lines(tail_lines);
    }
    tracing::debug!(
        exclusions = config.exclusions.len(),
        tail_lines = config.tail_lines,
        "rewrite configuration resolved"
    );
    Ok(config)
}

fn resolve_output(args: &RewriteArgs) -> Result<PathBuf> {
    let destination = if let Some(output) = &args.output {
        output.clone()
    } else {
        let dir = match &args.out_dir {
            Some(dir) => dir.clone(),
            None => parent_dir(&args.file),
        };
        let name = match &args.host {
            Some(host) => PathBuf::from(package_file_name(host, &chrono::Local::now())),
            None => unbloated_path(&args.file)
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| {
                    RewriteError::config(format!("{} has no file name", args.file.display()))
                })?,
        };
        dir.join(name)
    };

    let parent = parent_dir(&destination);
    std::fs::create_dir_all(&parent).map_err(|e| {
        RewriteError::from(e).with_context(format!("create {}", parent.display()))
    })?;
    Ok(destination)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .map_err(|e| RewriteError::from(e).with_context(format!("read {}", path.display())))?;
    Ok(bytes)
}

/// Write `bytes` to `destination` through a staged file in the same directory.
fn save_bytes(destination: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |e: std::io::Error| {
        RewriteError::from(e).with_context(format!("save {}", destination.display()))
    };
    let mut staged = tempfile::NamedTempFile::new_in(parent_dir(destination)).map_err(io_err)?;
    staged.write_all(bytes).map_err(io_err)?;
    staged.as_file().sync_all().map_err(io_err)?;
    staged.persist(destination).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// `--bloat`: keep the package as it is, copied to the usual output path.
fn copy_unchanged(args: &RewriteArgs) -> Result<RewriteSummary> {
    let destination = resolve_output(args)?;
    let bytes = read_source(&args.file)?;
    save_bytes(&destination, &bytes)?;
    tracing::info!(path = %destination.display(), "package left bloated");
    let size = bytes.len() as u64;
    Ok(RewriteSummary {
        source: args.file.clone(),
        output: Some(destination),
        mode: "bloat",
        sizes: SizeStats::new(size, size),
        report: None,
    })
}

fn render_text(summary: &RewriteSummary) -> String {
    let sizes = &summary.sizes;
    let mut out = String::new();
    out.push_str(&format!(
        "original: {} bytes ({:.2} MB)\n",
        sizes.original_bytes(),
        sizes.original_megabytes()
    ));
    out.push_str(&format!(
        "new:      {} bytes ({:.2} MB)\n",
        sizes.new_bytes(),
        sizes.new_megabytes()
    ));
    out.push_str(&format!(
        "savings:  {} bytes ({:.2} MB)\n",
        sizes.savings_bytes(),
        sizes.savings_megabytes()
    ));
    if let Some(report) = &summary.report {
        let m = &report.members;
        out.push_str(&format!(
            "members:  {} seen, {} kept, {} excluded, {} nested archives, {} non-file, {} links resolved, {} truncated\n",
            m.seen, m.kept, m.excluded, m.nested_archives, m.non_file, m.links_resolved, m.truncated
        ));
        for warning in &report.warnings {
            out.push_str(&format!("warning:  {}\n", warning));
        }
    }
    match &summary.output {
        Some(path) => out.push_str(&format!("saved:    {}\n", path.display())),
        None => out.push_str("saved:    (not saved)\n"),
    }
    out
}
