//! CLI entry point for the course downloader.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use coursedl::cli::{Args, extract_course_ids};
use coursedl::{Catalog, DownloadEngine, Downloader, Fetcher, MediaResolver, attempt_login};
use indicatif::ProgressBar;
use tracing::{debug, info};
use url::Url;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > debug flag > default (warn, so the
    // spinner stays readable)
    let default_level = if args.debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let debug_output = args.debug;
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if debug_output {
                eprintln!("Error: {e:?}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    debug!(?args, "CLI arguments parsed");

    let requested = extract_course_ids(&args.courses);
    if !args.all && requested.is_empty() {
        bail!("no course ids recognized; pass 6-digit course ids or course URLs, or use --all");
    }

    let base = Url::parse(&args.base_url)
        .with_context(|| format!("invalid base URL: {}", args.base_url))?;

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("logging in..");

    let session = attempt_login(&base, &args.email, &args.password)
        .await
        .context("login failed")?;
    info!("login succeeded");

    let fetcher = Fetcher::new(base, session);
    let catalog = Catalog::new(fetcher);

    let course_ids = if args.all {
        catalog
            .list_course_ids()
            .await
            .context("failed to list enrolled courses")?
    } else {
        requested
    };
    if course_ids.is_empty() {
        spinner.finish_and_clear();
        bail!("no courses available for download");
    }
    debug!(?course_ids, "resolved course ids");

    let engine = DownloadEngine::new(
        catalog,
        MediaResolver::new(),
        Downloader::new(args.ytdlp_bin),
        args.output,
        usize::try_from(args.concurrency).unwrap_or(usize::MAX),
        args.overwrite,
    )?
    .with_progress(spinner.clone());

    let stats = engine.stats();
    let result = engine.run(&course_ids).await;
    spinner.finish_and_clear();

    println!(
        "done: {} course(s), {} file(s), {} video(s), {} skipped",
        stats.courses(),
        stats.files(),
        stats.videos(),
        stats.skipped(),
    );
    result.context("download run failed")
}
