use super::ArchiveSink;
use crate::error::{Result, RewriteError};
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use std::io::Write;
use tar::{Builder, EntryType, Header};

/// Width of the name field in a ustar/GNU header.
const NAME_FIELD_BYTES: usize = 100;
/// Name of the GNU record that carries the next entry's full name.
const GNU_LONG_NAME: &[u8] = b"././@LongLink";

/// Writes members into a gzip-compressed tar stream.
///
/// Source metadata is not carried over: every member is written as a
/// regular file with mode 0644, uid/gid 0 and mtime 0. Names are written
/// byte-for-byte as given; names longer than the header field get a GNU
/// long-name record.
pub struct TarGzSink<W: Write> {
    tar: Builder<GzEncoder<W>>,
}

impl<W: Write> TarGzSink<W> {
    pub fn new(writer: W) -> Self {
        let encoder = GzBuilder::new()
            .mtime(0)
            .write(writer, Compression::default());
        Self {
            tar: Builder::new(encoder),
        }
    }

    fn append_regular(&mut self, name: &[u8], content: &[u8]) -> std::io::Result<()> {
        if name.len() > NAME_FIELD_BYTES {
            self.append_long_name(name)?;
        }
        let mut header = member_header(EntryType::Regular, content.len() as u64);
        set_name_field(&mut header, name);
        header.set_cksum();
        self.tar.append(&header, content)
    }

    fn append_long_name(&mut self, name: &[u8]) -> std::io::Result<()> {
        let mut record = name.to_vec();
        record.push(0);
        let mut header = member_header(EntryType::GNULongName, record.len() as u64);
        set_name_field(&mut header, GNU_LONG_NAME);
        header.set_cksum();
        self.tar.append(&header, record.as_slice())
    }
}

impl<W: Write> ArchiveSink for TarGzSink<W> {
    type Output = W;

    fn add_member(&mut self, name: &str, content: &[u8]) -> Result<()> {
        if is_unsafe_name(name) {
            tracing::warn!(
                member = %name,
                "member name points outside the extraction directory; written unchanged"
            );
        }

        self.append_regular(name.as_bytes(), content)
            .map_err(|e| RewriteError::from(e).with_context(format!("append '{}'", name)))
    }

    fn finish(self) -> Result<W> {
        let encoder = self
            .tar
            .into_inner()
            .map_err(|e| RewriteError::from(e).with_context("finalize tar"))?;
        let writer = encoder
            .finish()
            .map_err(|e| RewriteError::from(e).with_context("finish gzip"))?;
        Ok(writer)
    }
}

fn member_header(entry_type: EntryType, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header
}

/// Copy `name` into the header's name field, cut to the field width.
fn set_name_field(header: &mut Header, name: &[u8]) {
    let field = &mut header.as_old_mut().name;
    let len = name.len().min(NAME_FIELD_BYTES);
    field.fill(0);
    field[..len].copy_from_slice(&name[..len]);
}

/// Names that extract outside the working directory, or not at all.
fn is_unsafe_name(name: &str) -> bool {
    name.is_empty() || name.starts_with('/') || name.split('/').any(|part| part == "..")
}
