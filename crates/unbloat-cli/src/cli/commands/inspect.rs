use crate::cli::args::{InspectArgs, OutputFormat};
use crate::exit_codes::EXIT_SUCCESS;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use unbloat_core::{list_members, ArchiveListing, MemberKind, RewriteError};

pub fn run(args: InspectArgs) -> Result<i32> {
    let file = File::open(&args.file).map_err(|e| {
        RewriteError::from(e).with_context(format!("open {}", args.file.display()))
    })?;
    let listing = list_members(BufReader::new(file))
        .with_context(|| format!("failed to inspect {}", args.file.display()))?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Text => print!("{}", render_table(&listing)),
    }
    Ok(EXIT_SUCCESS)
}

fn kind_label(kind: MemberKind) -> &'static str {
    match kind {
        MemberKind::File => "file",
        MemberKind::Directory => "dir",
        MemberKind::HardLink => "hardlink",
        MemberKind::Symlink => "symlink",
        MemberKind::Other => "other",
    }
}

fn render_table(listing: &ArchiveListing) -> String {
    let mut out = format!(
        "codec: {}\nmembers: {}\n",
        listing.codec,
        listing.members.len()
    );
    for member in &listing.members {
        out.push_str(&format!(
            "{:>12}  {:<8}  {}",
            member.size,
            kind_label(member.kind),
            member.name
        ));
        if let Some(target) = &member.link_target {
            out.push_str(&format!(" -> {}", target));
        }
        out.push('\n');
    }
    out
}
