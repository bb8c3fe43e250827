//! Filesystem access for document loading.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

/// Parent directory of `path`, or `"."` when it has none.
fn parent_or_dot(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

/// Read `path` through a `cap-std` handle on its parent directory.
///
/// # Errors
///
/// Returns an [`std::io::Error`] when the path has no file name, the parent
/// directory cannot be opened or the file cannot be read as UTF-8.
pub(super) fn read_text(path: &Utf8Path) -> std::io::Result<String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("cannot determine file name for document path"))?;
    let dir = Dir::open_ambient_dir(parent_or_dot(path), ambient_authority())?;
    dir.read_to_string(file_name)
}
