//! Utility functions for URL handling, name sanitisation, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Base URL normalisation so relative ModernGov paths join predictably
//! - Query parameter lookup (committee `ID`, councillor `UID`)
//! - Directory and file name sanitisation for downloaded minutes
//! - String truncation for logging
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Parse a council base URL and make sure its path ends with `/`.
///
/// ModernGov pages are addressed relative to the site root
/// (`mgListCommittees.aspx`, `ieListMeetings.aspx`, ...). Some councils host
/// the platform under a sub-path, so the base must end with a slash for
/// [`Url::join`] to keep that sub-path. A trailing page name, query and
/// fragment are dropped, so any ModernGov page URL works as input.
///
/// # Examples
///
/// ```ignore
/// let base = normalize_base_url("https://democracy.durham.gov.uk").unwrap();
/// assert_eq!(base.as_str(), "https://democracy.durham.gov.uk/");
/// ```
pub fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    url.set_query(None);
    url.set_fragment(None);
    let mut path = url.path().to_string();
    if let Some(idx) = path.rfind('/') {
        // drop a trailing page name such as `mgListCommittees.aspx`
        if path[idx + 1..].contains('.') {
            path.truncate(idx + 1);
        }
    }
    if !path.ends_with('/') {
        path.push('/');
    }
    url.set_path(&path);
    Ok(url)
}

/// Look up a query parameter by exact (case-sensitive) name.
///
/// Returns `None` when the parameter is missing or empty.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Turn a committee name into a directory name.
///
/// Every character that is not an ASCII letter or digit becomes `_`, so the
/// result never contains separators, dots or whitespace. An empty name maps
/// to `_`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_dir_name("County Council"), "County_Council");
/// assert_eq!(sanitize_dir_name("../etc"), "___etc");
/// ```
pub fn sanitize_dir_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Derive a local file name from the last path segment of a URL.
///
/// The segment is percent-decoded; path separators and NUL are replaced with
/// `_`. Returns `None` for URLs without a usable final segment.
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let cleaned: String = decoded
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned)
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and a byte
/// count indicator appended. Cuts on a char boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_adds_slash() {
        let base = normalize_base_url("https://democracy.durham.gov.uk").unwrap();
        assert_eq!(base.as_str(), "https://democracy.durham.gov.uk/");

        let sub = normalize_base_url("https://council.example.gov.uk/moderngov").unwrap();
        assert_eq!(sub.as_str(), "https://council.example.gov.uk/moderngov/");
        assert_eq!(
            sub.join("mgListCommittees.aspx").unwrap().as_str(),
            "https://council.example.gov.uk/moderngov/mgListCommittees.aspx"
        );
    }

    #[test]
    fn test_normalize_base_url_drops_page_and_query() {
        let base = normalize_base_url("https://x.gov.uk/mgHome.aspx?bcr=1#top").unwrap();
        assert_eq!(base.as_str(), "https://x.gov.uk/");
        let sub = normalize_base_url("https://x.gov.uk/democracy/mgListCommittees.aspx").unwrap();
        assert_eq!(sub.as_str(), "https://x.gov.uk/democracy/");
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_query_param() {
        let url = Url::parse("https://x.gov.uk/mgCommitteeDetails.aspx?ID=135&bcr=1").unwrap();
        assert_eq!(query_param(&url, "ID"), Some("135".to_string()));
        assert_eq!(query_param(&url, "id"), None);
        let empty = Url::parse("https://x.gov.uk/mgUserInfo.aspx?UID=").unwrap();
        assert_eq!(query_param(&empty, "UID"), None);
    }

    #[test]
    fn test_sanitize_dir_name_is_filesystem_safe() {
        assert_eq!(sanitize_dir_name("County Council"), "County_Council");
        assert_eq!(sanitize_dir_name("Audit & Governance"), "Audit___Governance");
        assert_eq!(sanitize_dir_name("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_dir_name(""), "_");
        assert_eq!(sanitize_dir_name("Cyngor Sir Ynys Môn"), "Cyngor_Sir_Ynys_M_n");

        for name in ["a/b", "C:\\x", ". ..", "tab\there", "naïve"] {
            let s = sanitize_dir_name(name);
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'), "{s}");
        }
    }

    #[test]
    fn test_file_name_from_url() {
        let url = Url::parse(
            "https://x.gov.uk/documents/g1234/Printed%20minutes%2001st-Jan-2024.pdf?T=1",
        )
        .unwrap();
        assert_eq!(
            file_name_from_url(&url),
            Some("Printed minutes 01st-Jan-2024.pdf".to_string())
        );

        let sneaky = Url::parse("https://x.gov.uk/documents/..%2F..%2Fminutes.pdf").unwrap();
        assert_eq!(file_name_from_url(&sneaky), Some(".._.._minutes.pdf".to_string()));

        let dir = Url::parse("https://x.gov.uk/documents/").unwrap();
        assert_eq!(file_name_from_url(&dir), None);
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
        // multi-byte chars are not split
        assert!(truncate_for_log("ééé", 1).starts_with('é'));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
