//! Reform UK councillor attendance.
//!
//! For a council: read the member index, keep councillors whose party starts
//! with `Reform UK`, then read each one's expected/present meeting counts.
//! [`check_councils`] runs that for a whole councils list and sorts the list
//! into councils that worked and councils that failed.

use crate::fetch::PageFetcher;
use crate::models::{CouncilEntry, CouncilReformData, ReformAttendance};
use crate::outputs::json::write_json;
use crate::scrapers::PageShape;
use crate::utils::normalize_base_url;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};
use url::Url;

pub const REFORM_PARTY: &str = "Reform UK";
pub const WORKING_COUNCILS_FILE: &str = "noErrorsCouncils.json";
pub const FAILED_COUNCILS_FILE: &str = "failedCouncils.json";

/// Collect attendance for every Reform UK councillor of one council.
///
/// # Errors
///
/// Fails when the member index cannot be fetched or built. A councillor whose
/// statistics page fails or has no figures is logged and left out.
#[instrument(level = "info", skip_all, fields(%base))]
pub async fn collect_reform_attendance<F, S>(
    fetcher: &F,
    shape: &S,
    base: &Url,
) -> Result<Vec<ReformAttendance>, Box<dyn Error>>
where
    F: PageFetcher,
    S: PageShape,
{
    let index_url = shape.member_index_url(base)?;
    let html = fetcher.fetch_text(&index_url).await?;
    let members = shape.party_members(&html, base, REFORM_PARTY);
    info!(count = members.len(), "Found Reform UK councillors");

    let mut rows = Vec::with_capacity(members.len());
    for member in members {
        let url = shape.attendance_url(base, &member.uid)?;
        let page = match fetcher.fetch_text(&url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(uid = %member.uid, profile = %member.profile_url, %url, error = %e, "Failed to fetch attendance page");
                continue;
            }
        };
        let Some(stats) = shape.attendance_stats(&page) else {
            warn!(uid = %member.uid, profile = %member.profile_url, %url, "No attendance figures on page");
            continue;
        };
        rows.push(ReformAttendance {
            uid: member.uid,
            name: member.name,
            expected: stats.expected,
            present: stats.present,
        });
    }

    Ok(rows)
}

/// A councils-list file stem that is safe to use as a file name.
fn is_safe_stem(stem: &str) -> bool {
    !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Where a council's data file lives.
pub fn council_data_path(out_dir: &Path, entry: &CouncilEntry) -> PathBuf {
    out_dir.join(format!("{}Data.json", entry.file_name))
}

/// Collect one council and write `<out_dir>/<fileName>Data.json`.
///
/// Returns the number of Reform UK councillors written.
pub async fn run_council<F, S>(
    fetcher: &F,
    shape: &S,
    entry: &CouncilEntry,
    out_dir: &Path,
) -> Result<usize, Box<dyn Error>>
where
    F: PageFetcher,
    S: PageShape,
{
    if !is_safe_stem(&entry.file_name) {
        return Err(format!("unsafe fileName {:?}", entry.file_name).into());
    }
    let base = normalize_base_url(&entry.base_url)?;
    let rows = collect_reform_attendance(fetcher, shape, &base).await?;
    let count = rows.len();
    let data = CouncilReformData {
        council_name: entry.council_name.clone(),
        reform_attendance_data: rows,
    };
    write_json(&council_data_path(out_dir, entry), &data).await?;
    Ok(count)
}

/// Outcome of [`check_councils`].
#[derive(Debug, Default)]
pub struct CouncilCheck {
    pub working: Vec<CouncilEntry>,
    pub failed: Vec<CouncilEntry>,
}

/// Collect Reform attendance for each council and record which ones worked.
///
/// Each council's data goes to `<out_dir>/<fileName>Data.json`; the working
/// and failed lists are written to `report_dir`.
#[instrument(level = "info", skip_all, fields(councils = councils.len(), out_dir = %out_dir.display()))]
pub async fn check_councils<F, S>(
    fetcher: &F,
    shape: &S,
    councils: &[CouncilEntry],
    out_dir: &Path,
    report_dir: &Path,
) -> CouncilCheck
where
    F: PageFetcher,
    S: PageShape,
{
    let mut check = CouncilCheck::default();

    for entry in councils {
        info!(council = %entry.council_name, "Gathering data");
        match run_council(fetcher, shape, entry, out_dir).await {
            Ok(count) => {
                info!(council = %entry.council_name, councillors = count, "Council had no errors");
                check.working.push(entry.clone());
            }
            Err(e) => {
                warn!(council = %entry.council_name, error = %e, "Council failed");
                check.failed.push(entry.clone());
            }
        }
    }

    for (file, list) in [
        (WORKING_COUNCILS_FILE, &check.working),
        (FAILED_COUNCILS_FILE, &check.failed),
    ] {
        if let Err(e) = write_json(&report_dir.join(file), list).await {
            error!(%file, error = %e, "Failed to write council report");
        }
    }

    info!(
        working = check.working.len(),
        failed = check.failed.len(),
        "Council check complete"
    );
    check
}
