use std::io::{Error as IoError, ErrorKind};

/// True when an io error only says the file was not there.
///
/// Deleting a lock file that is already gone, or reading a preferences file
/// on first run, hits this and is not worth propagating.
pub fn is_not_found(err: &IoError) -> bool {
    err.kind() == ErrorKind::NotFound
}
