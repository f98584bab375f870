//! Unified logging initialization for Lanza binaries
//!
//! The filter is chosen with the following priority order:
//! 1. CLI flags (`-v/-q`) - highest priority
//! 2. RUST_LOG environment variable
//! 3. Binary-specific defaults - lowest priority
//!
//! Identity-client tracing (the `msal_logging` toggle) only widens the
//! binary default; it never overrides an explicit flag or `RUST_LOG`.

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used by the identity client and token provider
pub const IDENTITY_TARGET: &str = "lanza_sdk::auth";

/// Build the default filter directives for a binary
///
/// `binary_name` gets `level`; when `identity_tracing` is set the identity
/// client target is raised to `trace`.
pub fn default_filter(binary_name: &str, level: &str, identity_tracing: bool) -> String {
    let mut directives = vec![
        format!("{}={}", binary_name, level),
        format!("lanza_sdk={}", level),
    ];
    if identity_tracing {
        directives.push(format!("{}=trace", IDENTITY_TARGET));
    }
    directives.join(",")
}

/// Initialize logging with the specified verbosity level and default filter.
///
/// With `OffLevel` verbosity, `-v` flags enable logging and no flags fall
/// back to `RUST_LOG` and then `default_filter`.
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{OffLevel, Verbosity};
/// use lanza_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[command(flatten)]
///     verbosity: Verbosity<OffLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "lanza=warn").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = if let Some(log_level) = verbosity.log_level() {
        EnvFilter::try_new(format!("{}", log_level))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
