//! Data models for committees, meetings, attendance and councillors.
//!
//! Every document the tool writes is a flat JSON file; the structs here fix the
//! on-disk field names:
//! - [`Committee`]: one entry from a council's committee list
//! - [`CommitteeMeetingData`]: meeting pages found for a committee
//! - [`AttendanceRecord`]: attendance extracted from one minutes PDF
//! - [`ReformAttendance`] / [`CouncilReformData`]: per-council Reform UK statistics
//! - [`CouncilEntry`]: one council in a councils list
//! - [`CouncillorMemberships`]: committees a councillor sits on
//!
//! Some structs keep PascalCase or camelCase keys because the static frontend
//! reads those files as-is.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A committee as listed on `mgListCommittees.aspx`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Committee {
    /// Link text, trimmed.
    #[serde(rename = "Name")]
    pub name: String,
    /// Absolute committee details URL.
    #[serde(rename = "URL")]
    pub url: String,
}

/// Meeting pages collected for one committee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeMeetingData {
    pub committee_url: String,
    pub meeting_page_urls: Vec<String>,
}

/// Attendance extracted from a single set of meeting minutes.
///
/// The first seven fields come from the generative-AI reply (all optional in
/// the reply, hence `#[serde(default)]`); `filename`, `filepath` and
/// `processed_at` are stamped by the pipeline afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AttendanceRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub present: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub absent: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub officers_present: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub apologies: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
    pub filename: String,
    pub filepath: String,
    /// RFC 3339 timestamp.
    pub processed_at: String,
    /// Set only when the minutes could not be processed at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AttendanceRecord {
    /// An empty record titled after the file, carrying only `notes`.
    ///
    /// Used whenever the model reply cannot be turned into structured data.
    pub fn placeholder(filename: &str, notes: impl Into<String>) -> Self {
        Self {
            meeting_title: filename.to_string(),
            notes: notes.into(),
            ..Self::default()
        }
    }
}

/// Attendance statistics for one Reform UK councillor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReformAttendance {
    pub uid: String,
    pub name: String,
    /// Meetings the councillor was expected to attend.
    pub expected: u32,
    /// Meetings the councillor was recorded present at.
    pub present: u32,
}

/// The document written per council by the reform collector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilReformData {
    pub council_name: String,
    pub reform_attendance_data: Vec<ReformAttendance>,
}

/// One council in a councils list (`councils.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilEntry {
    /// Stem of the output file, `<fileName>Data.json`.
    pub file_name: String,
    pub council_name: String,
    pub base_url: String,
}

/// A councillor row picked out of the member index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouncillorRef {
    pub uid: String,
    pub name: String,
    /// Absolute profile URL.
    pub profile_url: String,
}

/// A councillor and the committees listed on their profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Councillor {
    pub name: String,
    #[serde(rename = "UID")]
    pub uid: String,
    pub committees: Vec<String>,
}

/// Wrapper kept so each map value reads `{"Councillor": {...}}` on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CouncillorMemberships {
    pub councillor: Councillor,
}
