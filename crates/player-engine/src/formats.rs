//! File formats the player offers in its chooser.

use std::path::Path;

/// Extensions accepted by the file chooser (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "aiff"];

/// Whether `ext` (without the leading dot) is a supported audio extension.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Whether `path` ends in a supported audio extension.
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(is_supported_extension)
        .unwrap_or(false)
}

/// Chooser filter label, e.g. `*.wav; *.mp3; *.aiff`.
pub fn filter_label() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!("*.{ext}"))
        .collect::<Vec<_>>()
        .join("; ")
}
