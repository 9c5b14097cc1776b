pub mod archive;
pub mod config;
pub mod error;
mod io;
mod links;
pub mod naming;
pub mod rewrite;
pub mod stats;
pub mod tail;

pub use archive::{
    list_members, ArchiveListing, ArchiveSink, ArchiveSource, Codec, MemberHeader, MemberKind,
    TarGzSink, TarSource,
};
pub use config::{
    parse_exclusion_list, RewriteConfig, RewriteConfigOverrides, DEFAULT_TAIL_LINES,
};
pub use error::{ErrorKind, Result, RewriteError};
pub use naming::{package_file_name, unbloated_path};
pub use rewrite::{BufferRewrite, FileRewrite, MemberReport, Rewriter, StreamRewrite};
pub use stats::{EncodingWarning, MemberStats, SizeStats};
