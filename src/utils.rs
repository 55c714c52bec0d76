//! Utility functions for archive entry and download file naming

use std::collections::HashSet;

/// Split a file name into its stem and extension
///
/// Only the last dot counts, and a leading dot does not start an extension.
///
/// # Examples
///
/// ```
/// use order_batch_dl::utils::split_extension;
///
/// assert_eq!(split_extension("front.jpg"), ("front", Some("jpg")));
/// assert_eq!(split_extension("photo.final.png"), ("photo.final", Some("png")));
/// assert_eq!(split_extension(".hidden"), (".hidden", None));
/// assert_eq!(split_extension("noext"), ("noext", None));
/// ```
#[must_use]
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Make an asset name safe to use as a flat archive entry name
///
/// Path separators and control characters become `_` so an entry can never
/// escape the archive root or nest into a directory.
#[must_use]
pub fn sanitize_entry_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Make an order name safe for a `Content-Disposition` filename
///
/// Keeps ASCII alphanumerics, `-`, `_` and space; everything else becomes `_`.
///
/// # Examples
///
/// ```
/// use order_batch_dl::utils::safe_download_name;
///
/// assert_eq!(safe_download_name("Beach House #2"), "Beach House _2");
/// assert_eq!(safe_download_name("a\"b"), "a_b");
/// ```
#[must_use]
pub fn safe_download_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Tracks names already handed out and suffixes collisions
///
/// The first occurrence of a stem keeps it; later ones get `_1`, `_2`, ... in
/// the order they are claimed.
#[derive(Debug, Default)]
pub struct UniqueNames {
    seen: HashSet<String>,
}

impl UniqueNames {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `stem`, returning it or the first free suffixed variant
    pub fn claim(&mut self, stem: &str) -> String {
        let mut unique = stem.to_string();
        let mut counter = 1u32;
        while self.seen.contains(&unique) {
            unique = format!("{stem}_{counter}");
            counter += 1;
        }
        self.seen.insert(unique.clone());
        unique
    }
}
