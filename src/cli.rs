//! Command-line interface definitions for council_minutes.
//!
//! One subcommand per pipeline. Settings for the generative-AI step can also
//! come from the environment (a `.env` file is loaded at startup).

use crate::config::{
    DEFAULT_MODEL, DEFAULT_PAGE_CAP, DEFAULT_POLITE_DELAY_MS, DEFAULT_PROMPT_CHARS,
    DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT_SECS,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for council_minutes.
///
/// # Examples
///
/// ```sh
/// # Download minutes for every committee, following earlier-meeting pages
/// council_minutes minutes https://democracy.durham.gov.uk --paginate
///
/// # Extract attendance from what was downloaded
/// GEMINI_API_KEY=... council_minutes attendance
///
/// # Reform UK attendance for a list of councils
/// council_minutes check-councils councils.json --out-dir out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Delay between consecutive page fetches, in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_POLITE_DELAY_MS)]
    pub delay_ms: u64,

    /// Maximum meeting-list pages fetched per committee
    #[arg(long, global = true, default_value_t = DEFAULT_PAGE_CAP)]
    pub page_cap: usize,

    /// HTTP request timeout, in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl a council's committees and download their minutes PDFs
    Minutes {
        /// Site root of the council's ModernGov install
        base_url: String,

        /// Follow "Earlier meetings" links past the first list page
        #[arg(long)]
        paginate: bool,

        /// Only process the first committee on the list
        #[arg(long)]
        first_committee_only: bool,

        /// Directory minutes are saved under, one sub-directory per committee
        #[arg(short, long, default_value = "minutes")]
        minutes_dir: PathBuf,

        /// Where the committee → meeting pages map is written
        #[arg(short, long, default_value = "committee_meeting_data.json")]
        output: PathBuf,
    },

    /// Extract attendance from downloaded minutes with Gemini
    Attendance {
        /// Directory holding one sub-directory of PDFs per committee
        #[arg(short, long, default_value = "minutes")]
        minutes_dir: PathBuf,

        /// Where the aggregate results are written
        #[arg(short, long, default_value = "attendance_extraction_results.json")]
        output: PathBuf,

        /// Gemini API key
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Requests per minute allowed against Gemini
        #[arg(long, env = "GEMINI_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT)]
        rate_limit: u32,

        /// Gemini model code
        #[arg(long, env = "GEMINI_MODEL_CODE", default_value = DEFAULT_MODEL)]
        model: String,

        /// Characters of minutes text sent per prompt
        #[arg(long, default_value_t = DEFAULT_PROMPT_CHARS)]
        prompt_chars: usize,

        /// The `pdftotext` executable
        #[arg(long, default_value = "pdftotext")]
        pdftotext: String,
    },

    /// Collect Reform UK councillor attendance for one council
    Reform {
        /// Site root of the council's ModernGov install
        base_url: String,

        /// Council name recorded in the output
        #[arg(long)]
        council_name: String,

        /// Output file stem, written as `<file-name>Data.json`
        #[arg(long)]
        file_name: String,

        /// Output directory
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },

    /// Run the Reform UK collector over a councils list
    CheckCouncils {
        /// JSON array of `{fileName, councilName, baseUrl}`
        councils: PathBuf,

        /// Directory for the per-council data files
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        /// Directory for noErrorsCouncils.json and failedCouncils.json
        #[arg(long, default_value = ".")]
        report_dir: PathBuf,
    },

    /// Record the committee memberships of every councillor
    Councillors {
        /// Site root of the council's ModernGov install
        base_url: String,

        /// Where the councillor → committees map is written
        #[arg(short, long, default_value = "councillor_committees.json")]
        output: PathBuf,
    },
}
