//! Download filename derivation and parsing.
//!
//! The server derives a safe, ASCII-only filename from the scraped title; the
//! companion client parses it back out of `Content-Disposition`.

use std::path::{Path, PathBuf};

/// Maximum length of a derived filename stem.
pub const MAX_FILENAME_STEM_LEN: usize = 100;

/// Stem used when a title sanitizes to nothing.
pub const FALLBACK_FILENAME_STEM: &str = "scribd_document";

/// Builds a filesystem- and header-safe filename stem from a document title.
///
/// Keeps ASCII alphanumerics, `_`, `-` and whitespace; collapses whitespace
/// runs into a single `_`; truncates to [`MAX_FILENAME_STEM_LEN`]; returns
/// [`FALLBACK_FILENAME_STEM`] when nothing survives.
#[must_use]
pub fn safe_filename_stem(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;
    for ch in title.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-') {
            if pending_space {
                out.push('_');
                pending_space = false;
            }
            out.push(ch);
        }
    }

    let truncated: String = out.chars().take(MAX_FILENAME_STEM_LEN).collect();
    if truncated.is_empty() {
        FALLBACK_FILENAME_STEM.to_string()
    } else {
        truncated
    }
}

/// Full `.pdf` filename for a document title.
#[must_use]
pub fn safe_pdf_filename(title: &str) -> String {
    format!("{}.pdf", safe_filename_stem(title))
}

/// `Content-Disposition` value the proxy sends for a successful retrieval.
#[must_use]
pub fn attachment_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

/// Reads the `filename` parameter back out of an [`attachment_disposition`] value.
///
/// Returns `None` when the parameter is missing or empty.
#[must_use]
pub fn attachment_filename(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("filename="))
        .map(|value| value.trim().trim_matches('"').trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolves a unique file path, adding a numeric suffix if the file exists.
///
/// The filename is re-sanitized so a hostile header cannot escape `dir`.
#[must_use]
pub fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) => (&filename[..pos], &filename[pos..]),
        None => (filename, ""),
    };
    let stem = safe_filename_stem(stem);
    let ext = if ext == ".pdf" { ext } else { ".pdf" };

    let base_path = dir.join(format!("{stem}{ext}"));
    if !base_path.exists() {
        return base_path;
    }

    for i in 1..1000 {
        let candidate = dir.join(format!("{stem}_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}_{timestamp}{ext}"))
}
