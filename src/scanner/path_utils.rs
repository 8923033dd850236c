//! Path helpers shared by the walker, the registry and the size accountant.
//!
//! Base names are the registry key, so they are normalized to NFC: macOS
//! volumes store names decomposed (NFD) while Linux and Windows volumes
//! usually store them composed, and the same visible name must land in one
//! record.
//!
//! ```
//! use fastdu::scanner::path_utils::base_name_key;
//! use std::path::Path;
//!
//! let nfc = base_name_key(Path::new("/mnt/a/café.jpg"));
//! let nfd = base_name_key(Path::new("/Volumes/b/cafe\u{0301}.jpg"));
//! assert_eq!(nfc, nfd);
//! ```

use std::borrow::Cow;
use std::path::{Component, Path};

use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

/// Normalize a name to NFC, borrowing when it already is.
#[must_use]
pub fn normalize_name(s: &str) -> Cow<'_, str> {
    match is_nfc_quick(s.chars()) {
        IsNormalized::Yes => Cow::Borrowed(s),
        _ => Cow::Owned(s.nfc().collect()),
    }
}

/// Registry key for a file: its NFC-normalized final component.
///
/// Returns `None` for paths without a file name (`/`, `..`).
#[must_use]
pub fn base_name_key(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    Some(normalize_name(&name).into_owned())
}

/// Lossy string form of a path, used for reports and path analysis.
#[must_use]
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// First segment of a directory path, keeping the root for absolute paths.
///
/// `/mnt/photos/2020` → `/mnt`, `photos/2020` → `photos`, `/` → `/`.
#[must_use]
pub fn top_level_segment(dir: &Path) -> String {
    let mut prefix = String::new();
    for component in dir.components() {
        match component {
            Component::Prefix(p) => prefix.push_str(&p.as_os_str().to_string_lossy()),
            Component::RootDir => prefix.push(std::path::MAIN_SEPARATOR),
            Component::CurDir => {}
            Component::ParentDir => return format!("{prefix}.."),
            Component::Normal(name) => {
                prefix.push_str(&name.to_string_lossy());
                return prefix;
            }
        }
    }
    if prefix.is_empty() {
        ".".to_string()
    } else {
        prefix
    }
}
