use lazy_static::lazy_static;
use regex::Regex;

use crate::core::error::{AppError, Result};

lazy_static! {
    /// Regex for category names, which double as top-level directory names
    /// Must be lowercase alphanumeric with hyphens
    /// - Valid: "documents", "lease-agreements", "images2"
    /// - Invalid: "-docs", "docs-", "docs--old", "Docs", "docs_old"
    pub static ref CATEGORY_NAME_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Maximum length of a single folder or file name segment
pub const MAX_SEGMENT_LEN: usize = 255;

/// Validate a single path segment (folder name or file name).
///
/// Rejects empty names, separators, dot segments and control characters so a
/// segment can never escape its parent directory on the primary backend.
pub fn validate_path_segment(segment: &str, what: &str) -> Result<()> {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", what)));
    }
    if trimmed != segment {
        return Err(AppError::Validation(format!(
            "{} must not start or end with whitespace",
            what
        )));
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            what, MAX_SEGMENT_LEN
        )));
    }
    if segment == "." || segment == ".." {
        return Err(AppError::Validation(format!("{} must not be '.' or '..'", what)));
    }
    if segment
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(AppError::Validation(format!(
            "{} contains invalid characters",
            what
        )));
    }
    Ok(())
}

/// Normalize a folder path coming from a request: trims separators and
/// validates every segment. The category root is the empty string.
pub fn normalize_folder_path(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    for segment in trimmed.split('/') {
        validate_path_segment(segment, "Folder name")?;
    }
    Ok(trimmed.to_string())
}

/// Join two path parts; an empty part ("" is the category root) adds nothing
pub fn join_path(parent: &str, name: &str) -> String {
    match (parent.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}/{}", parent, name),
    }
}

/// Split a file name at its last '.' into stem and lowercase extension.
///
/// `"Lease.PDF"` gives `("Lease", Some("pdf"))`, `"README"` gives
/// `("README", None)` and a trailing dot counts as no extension.
pub fn split_file_name(file_name: &str) -> (&str, Option<String>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, Some(ext.to_lowercase())),
        _ => (file_name, None),
    }
}

/// Validate a category name
pub fn validate_category_name(name: &str) -> Result<()> {
    if !CATEGORY_NAME_REGEX.is_match(name) {
        return Err(AppError::Validation(format!(
            "Invalid category name '{}': use lowercase letters, digits and single hyphens",
            name
        )));
    }
    Ok(())
}
