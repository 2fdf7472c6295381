//! Lexical path cleaning.

use std::path::{Component, Path, PathBuf};

/// Normalize a path: remove leading `/`, resolve `.` and `..`.
///
/// Purely lexical. `..` never climbs above the root, and the root itself is
/// the empty path.
pub fn clean(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(s) => result.push(s),
        }
    }
    result
}

/// Render a cleaned path for messages, showing the root as `.`.
pub(crate) fn display(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}

/// Last segment of a cleaned path, `.` for the root.
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}
