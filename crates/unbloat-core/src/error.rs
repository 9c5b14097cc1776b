//! Error types for archive rewriting.

/// Result type for rewrite operations.
pub type Result<T> = std::result::Result<T, RewriteError>;

/// Rewrite failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source is not a readable container (corrupt, truncated, empty, unknown compression).
    ArchiveFormat,
    /// Filesystem failure opening, reading, writing or persisting a file.
    Io,
    /// Invalid engine configuration or configuration file.
    Config,
    /// A configured resource limit was exceeded.
    Limit,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ArchiveFormat => "archive format error",
            Self::Io => "I/O error",
            Self::Config => "configuration error",
            Self::Limit => "limit exceeded",
        };
        f.write_str(name)
    }
}

/// Typed rewrite error. Only format and I/O failures abort a rewrite;
/// member-local decode problems are reported as warnings instead.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RewriteError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl RewriteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArchiveFormat, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_context(mut self, context: impl std::fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_format(&self) -> bool {
        self.kind == ErrorKind::ArchiveFormat
    }

    pub fn is_io(&self) -> bool {
        self.kind == ErrorKind::Io
    }

    /// Suggested exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::ArchiveFormat | ErrorKind::Limit => 1,
            ErrorKind::Config => 2,
            ErrorKind::Io => 3,
        }
    }

    /// Classify an I/O error surfacing from the archive iterator.
    ///
    /// Decompressors and the tar reader report corruption as `io::Error`;
    /// those are format errors. Failures of the underlying reader itself are
    /// tagged by [`crate::io::SourceReader`] and stay `Io`.
    pub(crate) fn from_source_stream(err: std::io::Error) -> Self {
        if crate::io::is_source_read_error(&err) {
            Self::io(err.to_string()).with_source(err)
        } else {
            Self::format(err.to_string()).with_source(err)
        }
    }
}

impl From<std::io::Error> for RewriteError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string()).with_source(err)
    }
}

impl From<serde_yaml::Error> for RewriteError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config(err.to_string()).with_source(err)
    }
}
