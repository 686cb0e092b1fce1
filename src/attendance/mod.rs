//! Attendance extraction from downloaded minutes.
//!
//! For each committee directory under the minutes root, every PDF is turned
//! into text ([`pdf`]), wrapped in the attendance prompt and sent to the model
//! ([`crate::api`]), and the reply parsed into an [`AttendanceRecord`]
//! ([`reply`]).
//!
//! Model calls are strictly sequential and spaced by
//! [`GenAiConfig::call_interval`]. A file that fails at any stage still yields
//! a record, so the output always has one entry per PDF.

pub mod pdf;
pub mod reply;

use crate::api::{AskAsync, ask_with_backoff};
use crate::config::GenAiConfig;
use crate::models::AttendanceRecord;
use crate::outputs::json::write_json;
use chrono::Utc;
use pdf::MinutesText;
use reply::{build_prompt, parse_reply};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Per-directory results file.
pub const DIRECTORY_RESULTS_FILE: &str = "attendance_results.json";

/// PDF files directly inside `dir`, sorted by name.
pub async fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut pdfs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && entry.file_type().await?.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// Sub-directories of `root`, sorted by name.
async fn list_subdirs(root: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut entries = fs::read_dir(root).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Extract attendance from one file. Never fails; problems end up in the record.
async fn process_file<A, X>(ask: &A, text: &X, config: &GenAiConfig, path: &Path) -> AttendanceRecord
where
    A: AskAsync<Response = String> + fmt::Debug,
    X: MinutesText,
{
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut record = match text.extract(path).await {
        Ok(body) => {
            let prompt = build_prompt(&body, config.prompt_chars);
            match ask_with_backoff(ask, &prompt).await {
                Ok(reply) => parse_reply(&reply, &filename),
                Err(e) => {
                    error!(%filename, error = %e, "GenAI error");
                    AttendanceRecord::placeholder(&filename, format!("Error processing: {e}"))
                }
            }
        }
        Err(e) => {
            warn!(%filename, error = %e, "Failed to extract text");
            AttendanceRecord {
                error: Some(e.to_string()),
                ..AttendanceRecord::placeholder(&filename, format!("Processing failed: {e}"))
            }
        }
    };

    record.filename = filename;
    record.filepath = path.display().to_string();
    record.processed_at = Utc::now().to_rfc3339();
    record
}

/// Extract attendance from every PDF in `dir`.
///
/// Writes the records to `dir/attendance_results.json` and returns them.
/// Only an unreadable directory is an error.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn process_pdfs_in_directory<A, X>(
    ask: &A,
    text: &X,
    config: &GenAiConfig,
    dir: &Path,
) -> Result<Vec<AttendanceRecord>, Box<dyn Error>>
where
    A: AskAsync<Response = String> + fmt::Debug,
    X: MinutesText,
{
    let pdfs = list_pdfs(dir).await?;
    let interval = config.call_interval();
    info!(count = pdfs.len(), ?interval, "Processing minutes");

    let mut results = Vec::with_capacity(pdfs.len());
    for (i, path) in pdfs.iter().enumerate() {
        info!(file = i + 1, of = pdfs.len(), path = %path.display(), "Extracting attendance");
        let record = process_file(ask, text, config, path).await;
        let called_model = record.error.is_none();
        results.push(record);

        if called_model && i + 1 < pdfs.len() {
            sleep(interval).await;
        }
    }

    if let Err(e) = write_json(&dir.join(DIRECTORY_RESULTS_FILE), &results).await {
        error!(error = %e, "Failed to save results");
    }
    Ok(results)
}

/// Run [`process_pdfs_in_directory`] over every committee directory.
///
/// The aggregate map (directory name → records) is rewritten to `output`
/// after each directory so an interrupted run keeps what it finished.
#[instrument(level = "info", skip_all, fields(root = %minutes_root.display(), output = %output.display()))]
pub async fn process_minutes_tree<A, X>(
    ask: &A,
    text: &X,
    config: &GenAiConfig,
    minutes_root: &Path,
    output: &Path,
) -> Result<BTreeMap<String, Vec<AttendanceRecord>>, Box<dyn Error>>
where
    A: AskAsync<Response = String> + fmt::Debug,
    X: MinutesText,
{
    let dirs = list_subdirs(minutes_root).await?;
    info!(directories = dirs.len(), "Processing attendance from minutes");

    let mut all = BTreeMap::new();
    for dir in dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match process_pdfs_in_directory(ask, text, config, &dir).await {
            Ok(records) => {
                all.insert(name, records);
            }
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "Failed to read committee directory");
                continue;
            }
        }
        if let Err(e) = write_json(output, &all).await {
            error!(error = %e, "Failed to save aggregate results");
        }
    }

    info!(directories = all.len(), "Attendance extraction complete");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Reads the "PDF" as UTF-8 text; files containing `corrupt` fail.
    struct PlainText;

    impl MinutesText for PlainText {
        async fn extract(&self, path: &Path) -> Result<String, Box<dyn Error>> {
            let body = std::fs::read_to_string(path)?;
            if body.contains("corrupt") {
                return Err("Syntax Error: Couldn't read xref table".into());
            }
            Ok(body)
        }
    }

    /// Replies with a canned answer per call and records prompts.
    #[derive(Debug)]
    struct Scripted {
        replies: Mutex<Vec<Result<String, String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            let replies = replies
                .into_iter()
                .rev()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl AskAsync for Scripted {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.prompts.lock().unwrap().push(text.to_string());
            let next = self.replies.lock().unwrap().pop();
            match next {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(e)) => Err(e.into()),
                None => Err("no more replies".into()),
            }
        }
    }

    fn config() -> GenAiConfig {
        GenAiConfig {
            api_key: "test".to_string(),
            model: "gemini-1.5-flash".to_string(),
            requests_per_minute: 60_000,
            prompt_chars: 50,
        }
    }

    #[tokio::test]
    async fn test_directory_produces_one_record_per_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("Cabinet");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.pdf"), "PRESENT: Councillor A Smith").unwrap();
        std::fs::write(dir.join("b.PDF"), "corrupt").unwrap();
        std::fs::write(dir.join("c.pdf"), "nothing useful").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let ask = Scripted::new(vec![
            Ok(r#"```json
{"meeting_title": "Cabinet", "present": ["Councillor A Smith"]}
```"#),
            Ok("Sorry, no attendance here."),
        ]);
        let records = process_pdfs_in_directory(&ask, &PlainText, &config(), &dir).await.unwrap();

        assert_eq!(records.len(), 3);

        assert_eq!(records[0].filename, "a.pdf");
        assert_eq!(records[0].present, vec!["Councillor A Smith"]);
        assert!(records[0].filepath.ends_with("a.pdf"));
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].processed_at).is_ok());

        assert_eq!(records[1].filename, "b.PDF");
        assert!(records[1].error.as_deref().unwrap().contains("xref"));
        assert!(records[1].notes.starts_with("Processing failed: "));

        assert_eq!(records[2].meeting_title, "c.pdf");
        assert_eq!(records[2].notes, "Sorry, no attendance here.");

        // the failed extraction never reached the model
        let prompts = ask.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("PRESENT: Councillor A Smith"));

        let saved: Vec<AttendanceRecord> =
            serde_json::from_str(&std::fs::read_to_string(dir.join(DIRECTORY_RESULTS_FILE)).unwrap()).unwrap();
        assert_eq!(saved, records);
    }

    #[tokio::test]
    async fn test_waits_only_after_model_calls_before_next_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "PRESENT: A").unwrap();
        std::fs::write(tmp.path().join("b.pdf"), "corrupt").unwrap();
        std::fs::write(tmp.path().join("c.pdf"), "PRESENT: C").unwrap();

        // 400 requests per minute is a 150 ms interval
        let config = GenAiConfig {
            requests_per_minute: 400,
            ..config()
        };
        let interval = config.call_interval();
        assert_eq!(interval, Duration::from_millis(150));

        let ask = Scripted::new(vec![Ok("{}"), Ok("{}")]);
        let t0 = Instant::now();
        let records = process_pdfs_in_directory(&ask, &PlainText, &config, tmp.path()).await.unwrap();
        let elapsed = t0.elapsed();

        assert_eq!(records.len(), 3);
        // after a.pdf only: b.pdf never reached the model and c.pdf is last
        assert!(elapsed >= interval, "no wait at all: {elapsed:?}");
        assert!(elapsed < interval * 2, "waited more than once: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_prompt_is_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("long.pdf"), "x".repeat(500)).unwrap();

        let ask = Scripted::new(vec![Ok("{}")]);
        process_pdfs_in_directory(&ask, &PlainText, &config(), tmp.path()).await.unwrap();

        let prompts = ask.prompts.lock().unwrap();
        assert!(prompts[0].contains(&"x".repeat(50)));
        assert!(!prompts[0].contains(&"x".repeat(51)));
    }

    #[tokio::test]
    async fn test_tree_aggregates_by_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("minutes");
        for (dir, file) in [("Cabinet", "m1.pdf"), ("County_Council", "m2.pdf")] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
            std::fs::write(root.join(dir).join(file), "text").unwrap();
        }
        std::fs::write(root.join("stray.pdf"), "text").unwrap();
        let output = tmp.path().join("attendance_extraction_results.json");

        let ask = Scripted::new(vec![Ok(r#"{"present": ["A"]}"#), Ok(r#"{"present": ["B"]}"#)]);
        let all = process_minutes_tree(&ask, &PlainText, &config(), &root, &output).await.unwrap();

        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["Cabinet", "County_Council"]);
        assert_eq!(all["Cabinet"][0].present, vec!["A"]);
        assert_eq!(all["County_Council"][0].present, vec!["B"]);

        let saved: BTreeMap<String, Vec<AttendanceRecord>> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(saved, all);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ask = Scripted::new(vec![]);
        let res = process_minutes_tree(
            &ask,
            &PlainText,
            &config(),
            &tmp.path().join("missing"),
            &tmp.path().join("out.json"),
        )
        .await;
        assert!(res.is_err());
    }
}
