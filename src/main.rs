//! sqldump - table rows to SQL INSERT statements
//!
//! Reads a JSON Lines row file and writes batched, correctly escaped INSERT
//! statements for the table described in the config file.
//!
//! # Usage
//!
//! ```bash
//! sqldump --config table.toml --input rows.jsonl --output t.sql
//! ```

use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use sqldump::cli::CliInterface;
use sqldump::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Run the dump, cancelling it on Ctrl+C
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    let cancel_token = CancellationToken::new();
    let cancel_token_clone = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                cancel_token_clone.cancel();
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    });

    let result = cli.run(cancel_token).await;
    ctrl_c_handle.abort();

    let stats = result?;
    cli.print_summary(&stats);
    Ok(())
}

/// Initialize logging system based on verbosity level
///
/// Verbosity flags win; otherwise `RUST_LOG` is honoured when set, falling
/// back to the configured level.
///
/// # Arguments
/// * `cli` - CLI interface with verbosity settings
fn initialize_logging(cli: &CliInterface) {
    let args = cli.args();
    let level = if args.very_verbose {
        Level::TRACE
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        cli.config().logging.level.to_tracing_level()
    };
    let flags_given = args.very_verbose || args.verbose || args.quiet;
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, flags_given, env.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

/// Build the log filter from the chosen level and optional env directives
fn log_filter(level: Level, flags_given: bool, env: Option<&str>) -> EnvFilter {
    let fallback = || EnvFilter::default().add_directive(LevelFilter::from_level(level).into());
    match env {
        Some(directives) if !flags_given => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| fallback())
        }
        _ => fallback(),
    }
}
