//! Logging setup.

use std::io::IsTerminal;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize tracing.
///
/// Priority for log level:
/// 1. `--verbose` (debug)
/// 2. `RUST_LOG` environment variable
/// 3. Default: info
///
/// Output goes to stderr, human readable if stderr is a terminal and JSON
/// lines otherwise.
pub fn init(verbose: bool) -> Result<()> {
	let filter_layer = if verbose {
		EnvFilter::new(Level::DEBUG.as_str())
	} else {
		EnvFilter::builder()
			.with_default_directive(Level::INFO.into())
			.from_env_lossy()
	};

	let fmt_layer = if std::io::stderr().is_terminal() {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.with_target(false)
			.without_time()
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.json()
			.boxed()
	};

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(fmt_layer)
		.try_init()?;

	Ok(())
}
