//! Archive read/write capability.
//!
//! The rewrite engine only talks to [`ArchiveSource`] and [`ArchiveSink`];
//! the tar-backed implementations live in [`tar_source`] and [`tar_sink`].
//!
//! # Example
//!
//! ```no_run
//! use unbloat_core::archive::{list_members, TarGzSink, ArchiveSink};
//! use std::io::Cursor;
//!
//! let mut sink = TarGzSink::new(Vec::new());
//! sink.add_member("node1/info.txt", b"hello").unwrap();
//! let bytes = sink.finish().unwrap();
//!
//! let listing = list_members(Cursor::new(&bytes)).unwrap();
//! assert_eq!(listing.members[0].name, "node1/info.txt");
//! ```

pub mod codec;
pub mod tar_sink;
pub mod tar_source;

pub use codec::Codec;
pub use tar_sink::TarGzSink;
pub use tar_source::TarSource;

use crate::error::Result;
use serde::Serialize;
use std::io::Read;

/// Kind of an archive entry, reduced to what the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    /// Regular content, including entry types the reader does not know.
    File,
    Directory,
    HardLink,
    Symlink,
    /// Devices, FIFOs and metadata records.
    Other,
}

impl MemberKind {
    pub fn is_file(self) -> bool {
        self == Self::File
    }

    pub fn is_link(self) -> bool {
        matches!(self, Self::HardLink | Self::Symlink)
    }
}

/// Name, kind and declared size of an entry, as read from its header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberHeader {
    pub name: String,
    pub kind: MemberKind,
    pub size: u64,
    /// Link target as stored in the header, for hard and symbolic links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

/// Callback invoked once per entry, in archive order. The content reader is
/// only valid for the duration of the call; leaving it unread skips the
/// content.
pub type MemberVisitor<'a> = dyn FnMut(&MemberHeader, &mut dyn Read) -> Result<()> + 'a;

/// Read side: an ordered sequence of named entries.
pub trait ArchiveSource {
    /// Outer compression the source was opened with.
    fn codec(&self) -> Codec;

    /// Walk every entry in source order. Stops at the first error returned
    /// by the source or the visitor.
    fn for_each_member(&mut self, visit: &mut MemberVisitor<'_>) -> Result<()>;
}

/// Write side: appends members in call order.
pub trait ArchiveSink {
    type Output;

    fn add_member(&mut self, name: &str, content: &[u8]) -> Result<()>;

    /// Terminate the container and any compression stream, returning the
    /// underlying writer.
    fn finish(self) -> Result<Self::Output>;
}

/// Entries of an archive, for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveListing {
    pub codec: Codec,
    pub members: Vec<MemberHeader>,
}

/// List the entries of an archive without reading their content.
pub fn list_members<R: Read>(reader: R) -> Result<ArchiveListing> {
    let mut source = TarSource::open(reader)?;
    let mut members = Vec::new();
    source.for_each_member(&mut |header, _content| {
        members.push(header.clone());
        Ok(())
    })?;
    Ok(ArchiveListing {
        codec: source.codec(),
        members,
    })
}
