//! JSON document output.
//!
//! Every artefact the tool produces is a pretty-printed JSON file. Parent
//! directories are created on demand.
//!
//! # Output Structure
//!
//! ```text
//! committee_meeting_data.json          # minutes run
//! minutes/
//! ├── County_Council/
//! │   ├── Printed minutes 12th-Jan-2024.pdf
//! │   └── attendance_results.json      # attendance run, per directory
//! attendance_extraction_results.json   # attendance run, aggregate
//! out/
//! └── lancashireData.json              # reform run, per council
//! noErrorsCouncils.json / failedCouncils.json
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json<T>(path: &Path, value: &T) -> Result<(), Box<dyn Error>>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, json).await?;
    info!("Wrote JSON file");
    Ok(())
}

/// Read and deserialize a JSON file.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let value = serde_json::from_str(&raw)?;
    debug!(bytes = raw.len(), "Read JSON file");
    Ok(value)
}
