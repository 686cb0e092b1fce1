//! # council_minutes
//!
//! Collects meeting minutes and councillor attendance from UK council sites
//! running ModernGov.
//!
//! ## Features
//!
//! - Enumerates a council's committees and walks each meeting list back
//!   through its "Earlier meetings" pages
//! - Downloads the minutes PDFs linked from every meeting page
//! - Extracts attendance (present, absent, apologies, officers) from the
//!   minutes through the Gemini API, rate limited
//! - Collects Reform UK councillors' expected/present meeting counts, for one
//!   council or a whole councils list
//! - Records which committees each councillor sits on
//!
//! ## Usage
//!
//! ```sh
//! council_minutes minutes https://democracy.durham.gov.uk --paginate
//! council_minutes attendance --minutes-dir minutes
//! council_minutes check-councils councils.json
//! ```
//!
//! ## Architecture
//!
//! Each subcommand is one sequential pipeline:
//! 1. **Minutes**: committee list → meeting pages → PDF downloads
//! 2. **Attendance**: PDFs → text → model reply → JSON records
//! 3. **Reform / check-councils**: member index → party filter → attendance statistics
//! 4. **Councillors**: member index → profiles → committee memberships

use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod attendance;
mod cli;
mod config;
mod crawl;
mod download;
mod fetch;
mod members;
mod models;
mod outputs;
mod reform;
mod scrapers;
mod utils;

use api::GeminiAsk;
use attendance::pdf::Pdftotext;
use cli::{Cli, Command};
use config::{CrawlConfig, GenAiConfig, HttpConfig};
use crawl::CouncilRun;
use fetch::HttpFetcher;
use models::CouncilEntry;
use outputs::json::{read_json, write_json};
use scrapers::ModernGov;
use utils::{ensure_writable_dir, normalize_base_url};

/// Ensure `dir` is writable, logging the failure the same way for every pipeline.
async fn require_writable(dir: &Path) -> Result<(), Box<dyn Error>> {
    if let Err(e) = ensure_writable_dir(dir).await {
        error!(
            path = %dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    Ok(())
}

/// Directory part of an output file path, `.` for a bare file name.
fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("council_minutes starting up");

    let args = Cli::parse();
    debug!(
        delay_ms = args.delay_ms,
        page_cap = args.page_cap,
        timeout_secs = args.timeout_secs,
        "Parsed CLI arguments"
    );

    let http = HttpConfig::from_cli(&args);
    let crawl = CrawlConfig::from_cli(&args);
    let fetcher = HttpFetcher::new(&http)?;
    let shape = ModernGov;

    match args.command {
        Command::Minutes {
            base_url,
            paginate,
            first_committee_only,
            minutes_dir,
            output,
        } => {
            let base = normalize_base_url(&base_url)?;
            require_writable(&minutes_dir).await?;
            require_writable(parent_dir(&output)).await?;

            let run = CouncilRun {
                crawl: &crawl,
                paginate,
                first_committee_only,
                minutes_root: &minutes_dir,
            };
            let data = crawl::get_minutes_for_council(&fetcher, &shape, &base, &run).await;
            if data.is_empty() {
                error!(%base, "No committees processed");
            }
            write_json(&output, &data).await?;
            info!(path = %output.display(), committees = data.len(), "Saved committee meeting data");
        }

        Command::Attendance {
            minutes_dir,
            output,
            api_key,
            rate_limit,
            model,
            prompt_chars,
            pdftotext,
        } => {
            require_writable(parent_dir(&output)).await?;

            let genai = GenAiConfig {
                api_key,
                model,
                requests_per_minute: rate_limit,
                prompt_chars,
            };
            info!(model = %genai.model, interval = ?genai.call_interval(), "Using Gemini");

            let client = reqwest::Client::builder().timeout(http.timeout).build()?;
            let ask = GeminiAsk::new(&genai, client);
            let text = Pdftotext { program: pdftotext };

            let results =
                attendance::process_minutes_tree(&ask, &text, &genai, &minutes_dir, &output).await?;
            let records: usize = results.values().map(Vec::len).sum();
            info!(directories = results.len(), records, path = %output.display(), "Saved attendance results");
        }

        Command::Reform {
            base_url,
            council_name,
            file_name,
            out_dir,
        } => {
            require_writable(&out_dir).await?;

            let entry = CouncilEntry {
                file_name,
                council_name,
                base_url,
            };
            let councillors = reform::run_council(&fetcher, &shape, &entry, &out_dir).await?;
            let path = reform::council_data_path(&out_dir, &entry);
            info!(path = %path.display(), councillors, "Saved Reform attendance");
        }

        Command::CheckCouncils {
            councils,
            out_dir,
            report_dir,
        } => {
            require_writable(&out_dir).await?;
            require_writable(&report_dir).await?;

            let list: Vec<CouncilEntry> = read_json(&councils).await?;
            info!(count = list.len(), path = %councils.display(), "Loaded councils list");
            let check = reform::check_councils(&fetcher, &shape, &list, &out_dir, &report_dir).await;
            if !check.failed.is_empty() {
                let names = check.failed.iter().map(|c| c.council_name.as_str()).join(", ");
                warn!(working = check.working.len(), failed = %names, "Some councils failed");
            }
        }

        Command::Councillors { base_url, output } => {
            let base = normalize_base_url(&base_url)?;
            require_writable(parent_dir(&output)).await?;

            let memberships = members::collect_memberships(&fetcher, &shape, &crawl, &base).await?;
            write_json(&output, &memberships).await?;
            info!(path = %output.display(), councillors = memberships.len(), "Saved committee memberships");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
