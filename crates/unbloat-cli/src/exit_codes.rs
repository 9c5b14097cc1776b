//! Exit codes of the `unbloat` binary.
//! These codes are part of the public contract; scripts branch on them.

use unbloat_core::{ErrorKind, RewriteError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ARCHIVE_ERROR: i32 = 1; // Source is not a readable archive, or a limit was hit
pub const EXIT_CONFIG_ERROR: i32 = 2; // Bad flags, config file or exclusion list
pub const EXIT_IO_ERROR: i32 = 3; // Filesystem failure reading or writing a package

/// Map a command failure to an exit code. Typed rewrite errors map by kind;
/// anything else is treated as a configuration problem.
pub fn for_error(err: &anyhow::Error) -> i32 {
    let Some(e) = err.downcast_ref::<RewriteError>() else {
        return EXIT_CONFIG_ERROR;
    };
    match e.kind() {
        ErrorKind::ArchiveFormat | ErrorKind::Limit => EXIT_ARCHIVE_ERROR,
        ErrorKind::Config => EXIT_CONFIG_ERROR,
        ErrorKind::Io => EXIT_IO_ERROR,
    }
}
