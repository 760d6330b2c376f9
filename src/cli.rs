//! Command-line interface definition and input normalization.

use std::sync::LazyLock;

use clap::Parser;
use regex::Regex;

use crate::engine::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::fetch::DEFAULT_BASE_URL;

/// Course ids are exactly 6 digits, arriving bare or at the tail of a
/// pasted course URL. The anchors reject runs that are part of a longer
/// number.
#[allow(clippy::expect_used)]
static COURSE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{6})/?$").expect("static regex"));

/// Bulk course content downloader.
///
/// Logs in once, walks the requested courses, and saves every attachment
/// and video under deterministic names so interrupted runs can resume.
#[derive(Debug, Parser)]
#[command(name = "coursedl", version, about)]
pub struct Args {
    /// Course ids or course page URLs to download.
    #[arg(value_name = "COURSE")]
    pub courses: Vec<String>,

    /// Download every enrolled course instead of naming them.
    #[arg(short, long)]
    pub all: bool,

    /// Account email.
    #[arg(long, env = "COURSEDL_EMAIL")]
    pub email: String,

    /// Account password.
    #[arg(long, env = "COURSEDL_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Maximum concurrent network operations.
    #[arg(
        short,
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(MIN_CONCURRENCY as u64..=MAX_CONCURRENCY as u64)
    )]
    pub concurrency: u64,

    /// Directory to download into.
    #[arg(short, long, default_value = ".")]
    pub output: String,

    /// Re-download files that already exist.
    #[arg(long)]
    pub overwrite: bool,

    /// Platform origin to download from.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Stream-extraction helper binary for hosted videos.
    #[arg(long, default_value = "yt-dlp")]
    pub ytdlp_bin: String,

    /// Print full error chains and debug-level logs.
    #[arg(long)]
    pub debug: bool,
}

/// Extracts 6-digit course ids from bare ids and pasted URLs, preserving
/// input order and dropping arguments with no recognizable id.
#[must_use]
pub fn extract_course_ids(inputs: &[String]) -> Vec<String> {
    inputs
        .iter()
        .filter_map(|input| {
            COURSE_ID_RE
                .captures(input)
                .map(|captures| captures[1].to_string())
        })
        .collect()
}
