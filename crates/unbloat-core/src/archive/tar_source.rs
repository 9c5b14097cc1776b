use super::codec::{Codec, Decoded};
use super::{ArchiveSource, MemberHeader, MemberKind, MemberVisitor};
use crate::error::{Result, RewriteError};
use crate::io::SourceReader;
use std::io::Read;
use tar::EntryType;

/// Tar archive reader with auto-detected outer compression.
pub struct TarSource<R: Read> {
    archive: tar::Archive<Decoded<SourceReader<R>>>,
    codec: Codec,
}

impl<R: Read> TarSource<R> {
    /// Open a source stream. Fails with a format error when the stream is
    /// empty; corrupt content is only detected while iterating.
    pub fn open(reader: R) -> Result<Self> {
        let (decoded, codec) = Decoded::open(SourceReader::new(reader))?;
        Ok(Self {
            archive: tar::Archive::new(decoded),
            codec,
        })
    }
}

impl<R: Read> ArchiveSource for TarSource<R> {
    fn codec(&self) -> Codec {
        self.codec
    }

    fn for_each_member(&mut self, visit: &mut MemberVisitor<'_>) -> Result<()> {
        let entries = self
            .archive
            .entries()
            .map_err(|e| RewriteError::from_source_stream(e).with_context("tar stream"))?;

        for (i, entry) in entries.enumerate() {
            let mut entry = entry.map_err(|e| {
                RewriteError::from_source_stream(e).with_context(format!("entry #{}", i))
            })?;

            // path_bytes() already resolves GNU long names and pax paths.
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let size = entry.header().size().map_err(|e| {
                RewriteError::from_source_stream(e).with_context(format!("entry '{}'", name))
            })?;
            let kind = member_kind(entry.header().entry_type());
            let link_target = if kind.is_link() {
                entry
                    .link_name_bytes()
                    .map(|target| String::from_utf8_lossy(&target).into_owned())
            } else {
                None
            };
            let header = MemberHeader {
                name,
                kind,
                size,
                link_target,
            };

            visit(&header, &mut entry)?;
        }
        Ok(())
    }
}

/// Unknown entry types carry their content like regular files do.
fn member_kind(entry_type: EntryType) -> MemberKind {
    match entry_type {
        EntryType::Regular
        | EntryType::Continuous
        | EntryType::GNUSparse
        | EntryType::__Nonexhaustive(_) => MemberKind::File,
        EntryType::Directory => MemberKind::Directory,
        EntryType::Link => MemberKind::HardLink,
        EntryType::Symlink => MemberKind::Symlink,
        _ => MemberKind::Other,
    }
}
