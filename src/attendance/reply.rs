//! Attendance prompt and model reply parsing.

use crate::models::AttendanceRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

const PROMPT_HEAD: &str = r#"Please analyze the following council meeting minutes text and extract the attendance information.
Look for sections that list who was present, absent, or attended the meeting.

Please return a JSON object with the following structure:
{
    "meeting_title": "Title of the meeting if available",
    "meeting_date": "Date of the meeting if available",
    "present": ["Councillor Name 1", "Councillor Name 2", "Councillor Name 3"],
    "absent": ["Councillor Name 4", "Councillor Name 5"],
    "officers_present": ["Officer Name 1", "Officer Name 2"],
    "apologies": ["Councillor Name 6", "Councillor Name 7"],
    "notes": "Any additional notes about attendance"
}

IMPORTANT:
- For the "present" array, list each councillor's name as a separate string in the array
- Include full names (e.g. "Councillor John Smith", "Cllr Jane Doe")
- Each name should be a separate array element
- If any category is not found or mentioned, include it as an empty array or empty string
- Only extract names that are clearly identified as attendees

Meeting minutes text:
"#;

/// Build the attendance prompt around the first `max_chars` characters of `text`.
pub fn build_prompt(text: &str, max_chars: usize) -> String {
    let excerpt: String = text.chars().take(max_chars).collect();
    format!("{PROMPT_HEAD}{excerpt}\n")
}

/// Turn a model reply into an attendance record.
///
/// The reply may wrap its JSON in prose or code fences; the outermost
/// `{...}` span is parsed. Without a parsable object the record is empty and
/// carries the raw reply in `notes`.
pub fn parse_reply(reply: &str, filename: &str) -> AttendanceRecord {
    let Some(found) = JSON_OBJECT.find(reply) else {
        return AttendanceRecord::placeholder(filename, reply);
    };
    match serde_json::from_str::<AttendanceRecord>(found.as_str()) {
        Ok(mut record) => {
            // stamped by the pipeline, never taken from the model
            record.filename.clear();
            record.filepath.clear();
            record.processed_at.clear();
            record.error = None;
            record
        }
        Err(e) => {
            warn!(%filename, error = %e, "Failed to parse JSON reply; keeping raw response");
            AttendanceRecord::placeholder(filename, reply)
        }
    }
}
