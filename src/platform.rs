//! Filesystem identity checks.

use std::fs;
use std::io;
use std::path::Path;

/// Whether both paths refer to the same underlying file (hardlinks of each other).
#[cfg(unix)]
pub fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let meta_a = fs::metadata(a)?;
    let meta_b = fs::metadata(b)?;
    Ok(meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino())
}

/// Whether both paths refer to the same underlying file.
///
/// Without inode numbers only path identity can be established.
#[cfg(not(unix))]
pub fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}
