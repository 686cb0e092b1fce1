//! Minutes download.
//!
//! Given a meeting page, find its minutes links and save the PDFs under
//! `<minutes_root>/<sanitized committee name>/`. Only same-origin `.pdf`
//! targets are fetched. A missing link, a rejected target or a failed
//! download is logged and skipped.

use crate::fetch::PageFetcher;
use crate::scrapers::PageShape;
use crate::utils::{file_name_from_url, sanitize_dir_name};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Whether `target` is a PDF served from the same origin as `page`.
///
/// The check is on the URL only: scheme, host and port must match and the
/// path must end in `.pdf` (any case). Query strings are ignored.
pub fn is_same_origin_pdf(target: &Url, page: &Url) -> bool {
    target.origin() == page.origin() && target.path().to_ascii_lowercase().ends_with(".pdf")
}

/// Directory that holds a committee's minutes.
pub fn committee_dir(minutes_root: &Path, committee_name: &str) -> PathBuf {
    minutes_root.join(sanitize_dir_name(committee_name))
}

/// Download every minutes PDF linked from a meeting page.
///
/// Returns the paths written. Never fails: every problem is logged.
#[instrument(level = "info", skip_all, fields(%meeting_page, committee = %committee_name))]
pub async fn download_minutes<F, S>(
    fetcher: &F,
    shape: &S,
    meeting_page: &Url,
    committee_name: &str,
    minutes_root: &Path,
) -> Vec<PathBuf>
where
    F: PageFetcher,
    S: PageShape,
{
    let html = match fetcher.fetch_text(meeting_page).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "Failed to fetch meeting page");
            return Vec::new();
        }
    };

    let links = shape.minutes_links(&html, meeting_page);
    if links.is_empty() {
        info!("No minutes link found on meeting page");
        return Vec::new();
    }

    let dir = committee_dir(minutes_root, committee_name);
    let mut written = Vec::new();

    for link in links {
        if !is_same_origin_pdf(&link, meeting_page) {
            warn!(%link, "Minutes link is not a same-origin PDF; skipping");
            continue;
        }
        let Some(file_name) = file_name_from_url(&link) else {
            warn!(%link, "Minutes link has no usable file name; skipping");
            continue;
        };
        if let Err(e) = fs::create_dir_all(&dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create committee directory");
            return written;
        }
        let destination = dir.join(file_name);
        if let Some(path) = download_file(fetcher, &link, destination).await {
            written.push(path);
        }
    }

    written
}

/// Fetch `url` and write it to `destination`.
#[instrument(level = "debug", skip_all, fields(%url))]
async fn download_file<F: PageFetcher>(fetcher: &F, url: &Url, destination: PathBuf) -> Option<PathBuf> {
    let bytes = match fetcher.fetch_bytes(url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Failed to download minutes");
            return None;
        }
    };

    match fs::write(&destination, &bytes).await {
        Ok(()) => {
            info!(path = %destination.display(), bytes = bytes.len(), "Downloaded minutes");
            Some(destination)
        }
        Err(e) => {
            error!(path = %destination.display(), error = %e, "Failed to write minutes");
            None
        }
    }
}
