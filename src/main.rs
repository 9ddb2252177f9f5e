//! Command-line entry point.
//!
//! A thin wrapper around the `diag_support` library:
//! - `replay` shows stored diagnostics, once or periodically
//! - `emit` buffers and flushes one record
//! - `tag` prints the revision tag for an executable
//! - `timezone` prints the `SET time_zone` statement for an offset

use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, Utc};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use diag_support::app::shutdown_gracefully;
use diag_support::config::{Command, EmitArgs, Opt, ReplayArgs, TagArgs, TimezoneArgs};
use diag_support::diagnostics::parse_time;
use diag_support::initialization::{init_diagnostics, init_diagnostics_connection, init_logger_with};
use diag_support::{
    set_db_time_zone_sql, DiagnosticsConfig, DiagnosticsReview, FlushOutcome,
    RevisionTagResolver, SourceLocation,
};

#[tokio::main]
async fn main() -> Result<()> {
    // DIAG_DB_URL may come from a .env file in the working directory.
    let _ = dotenvy::dotenv();

    let opt = Opt::parse();
    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let result = match opt.command {
        Command::Replay(args) => replay(args).await,
        Command::Emit(args) => emit(args).await,
        Command::Tag(args) => tag(args),
        Command::Timezone(args) => timezone(args),
    };

    if let Err(e) = result {
        eprintln!("diag_support error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn replay(args: ReplayArgs) -> Result<()> {
    let since = match args.since.as_deref() {
        Some(text) => parse_time(text)
            .with_context(|| format!("Invalid --since timestamp '{}'", text))?,
        None => Local::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .context("Failed to compute start of day")?,
    };

    let config = DiagnosticsConfig {
        show_diagnostics: true,
        review_interval: Duration::from_secs(args.interval.max(1)),
        ..Default::default()
    };
    let diagnostics = init_diagnostics(config, "replay");
    init_diagnostics_connection(&diagnostics, &args.db)
        .await
        .context("Failed to open diagnostics database")?;

    let review = Arc::new(DiagnosticsReview::starting_at(Arc::clone(&diagnostics), since));
    if !args.follow {
        review.review().await;
        shutdown_gracefully(CancellationToken::new(), None, &diagnostics).await;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    // Show everything up to now before waiting for the first interval.
    review.review().await;
    let task = Arc::clone(&review).spawn(cancel.clone());
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    shutdown_gracefully(cancel, Some(task), &diagnostics).await;
    Ok(())
}

async fn emit(args: EmitArgs) -> Result<()> {
    let diagnostics = init_diagnostics(DiagnosticsConfig::default(), "emit");
    if let Some(url) = args.db.as_deref() {
        init_diagnostics_connection(&diagnostics, url)
            .await
            .context("Failed to open diagnostics database")?;
    }
    if let Some(tag) = args.tag {
        diagnostics.set_revision_tag(tag);
    }

    diagnostics.append(
        args.severity,
        SourceLocation::new(args.file, args.function, args.line),
        args.message,
    );
    match shutdown_gracefully(CancellationToken::new(), None, &diagnostics).await {
        FlushOutcome::Database(report) if report.failed > 0 => {
            anyhow::bail!("{} record(s) could not be stored", report.failed)
        }
        _ => Ok(()),
    }
}

fn tag(args: TagArgs) -> Result<()> {
    let resolver = RevisionTagResolver::new();
    println!("{}", resolver.resolve(&args.exe, &args.program));
    Ok(())
}

fn timezone(args: TimezoneArgs) -> Result<()> {
    let zone = args
        .offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("Offset out of range: {} minutes", args.offset_minutes))?;
    println!("{}", set_db_time_zone_sql(&zone, &Utc::now()));
    Ok(())
}
