//! PDF text extraction through poppler's `pdftotext`.

use std::error::Error;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Source of plain text for a minutes file.
pub trait MinutesText {
    async fn extract(&self, path: &Path) -> Result<String, Box<dyn Error>>;
}

/// Runs `pdftotext -layout -enc UTF-8 <file> -` and joins pages with a blank line.
#[derive(Debug, Clone)]
pub struct Pdftotext {
    pub program: String,
}

impl Default for Pdftotext {
    fn default() -> Self {
        Self {
            program: "pdftotext".to_string(),
        }
    }
}

/// `pdftotext` separates pages with form feeds.
pub fn join_pages(raw: &str) -> String {
    raw.split('\u{c}')
        .map(str::trim_end)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl MinutesText for Pdftotext {
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String, Box<dyn Error>> {
        let output = Command::new(&self.program)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} exited with {}: {}", self.program, output.status, stderr.trim()).into());
        }

        let text = join_pages(&String::from_utf8_lossy(&output.stdout));
        debug!(chars = text.chars().count(), "Extracted PDF text");
        Ok(text)
    }
}
