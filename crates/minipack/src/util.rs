//! Small path and text helpers shared across the bundler

use std::path::{Component, Path, PathBuf};

/// Normalize line endings to LF.
///
/// Byte offsets reported by the parser are taken against the normalized text,
/// so every consumer of a module's source must go through this first.
pub fn normalize_line_endings(content: String) -> String {
    if content.contains('\r') {
        content.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        content
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. Symlinks are never consulted.
///
/// `..` above the root of an absolute path is discarded; `..` at the start of a
/// relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                match normalized.components().next_back() {
                    Some(Component::Normal(_)) => {
                        normalized.pop();
                    }
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    _ => normalized.push(".."),
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
