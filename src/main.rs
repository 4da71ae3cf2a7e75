//! # Feed Digest
//!
//! Collects the RSS snapshots produced by a scheduled crawling job, merges
//! them into one deduplicated set of articles, renders an HTML digest and
//! emails it.
//!
//! ## Usage
//!
//! ```sh
//! GITHUB_TOKEN=... GITHUB_REPOSITORY=owner/name \
//! SENDER_EMAIL=... SENDER_PASSWORD=... RECIPIENT_EMAIL=... \
//! feed_digest
//! ```
//!
//! ## Architecture
//!
//! The application runs a strictly sequential pipeline:
//! 1. **Fetching**: Page through the artifact listing and unzip each archive
//! 2. **Merging**: Fold every `RSS_FEEDS_*.json` into one collection, first link wins
//! 3. **Rendering**: Group by source or by keyword into an HTML document
//! 4. **Sending**: Deliver the document once over SMTP
//!
//! All configuration needed by the selected stages is validated before any
//! network call. Fatal errors exit non-zero; an empty merge exits zero
//! without sending.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod digest;
mod mailer;
mod models;
mod outputs;
mod sources;
mod utils;

use cli::Cli;
use config::{Settings, StageConfig};
use digest::{DigestOutcome, build_digest, send_digest};
use mailer::SmtpDispatcher;
use sources::artifacts::{ArtifactClient, fetch_all};

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded .env file");
    }

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

#[instrument(level = "info", skip_all, fields(mode = ?args.mode))]
async fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    info!("feed_digest starting up");

    let settings = Settings::load(args.config.as_deref())?;
    let dir = args.working_dir();
    let group_by = args.group_by.unwrap_or(settings.group_by);

    // ---- Validate everything the selected stages need, before any I/O ----
    let StageConfig { credentials, mail } =
        StageConfig::from_env(args.mode, args.dry_run, args.repository.clone(), &settings)?;

    // ---- Fetch ----
    if let Some(credentials) = credentials {
        info!(repository = %credentials.repository, dir = %dir.display(), "Fetching artifacts");
        let client = ArtifactClient::new(&settings, credentials)?;
        fetch_all(&client, &dir).await?;
    }

    // ---- Merge, render, send ----
    if args.mode.digests() {
        let now = Local::now().naive_local();

        match mail {
            Some(mail) => {
                let dispatcher = SmtpDispatcher::new(mail, &settings);
                match send_digest(&dir, group_by, &settings, now, &dispatcher).await? {
                    DigestOutcome::NothingToSend => {}
                    DigestOutcome::Sent { articles } => info!(articles, "Digest delivered"),
                }
            }
            None => match build_digest(&dir, group_by, &settings, now).await? {
                Some(digest) => {
                    info!(
                        subject = %digest.subject,
                        sources = digest.sources,
                        articles = digest.articles,
                        "Dry run; printing digest instead of sending"
                    );
                    println!("{}", digest.html);
                }
                None => info!("ℹ️ No new news items to send"),
            },
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
