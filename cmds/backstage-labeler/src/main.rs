use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use labeler_core::{
	config::DEFAULT_CONFIG_FILE, process_batch, Config, MetadataStore, ProcessContext,
};
use tracing::{error, info, warn};

mod discover;
mod telemetry;

use discover::Target;

#[derive(Parser)]
#[command(name = "backstage-labeler")]
#[command(
	about = "Add Backstage labels to Kubernetes manifests based on YAML configuration",
	long_about = None
)]
#[command(version)]
#[command(after_help = "Examples:
  backstage-labeler manifests.yaml
  backstage-labeler ./manifests
  backstage-labeler --config custom-config.yaml ./output
  backstage-labeler --verbose ./manifests")]
struct Cli {
	/// File or directory to process
	#[arg(default_value = ".")]
	target: PathBuf,

	/// Path to configuration YAML file
	#[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
	config: PathBuf,

	/// Enable verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> Result<ExitCode> {
	let cli = Cli::parse();
	telemetry::init(cli.verbose)?;

	let mut config = Config::load(&cli.config);
	if cli.verbose {
		config.verbose = true;
	}
	let store = MetadataStore::load(&config.metadata_source_file);

	let target = match discover::resolve_target(&cli.target) {
		Ok(target) => target,
		Err(err) => {
			error!("{err}");
			return Ok(ExitCode::FAILURE);
		}
	};
	if let Target::Directory { root, files } = &target {
		if files.is_empty() {
			warn!("no YAML files found in `{}`", root.display());
		}
	}

	let report = process_batch(target.files(), ProcessContext::new(&config, &store));
	if report.failed() > 0 {
		warn!(
			"{} of {} files failed to process",
			report.failed(),
			report.results.len()
		);
	}
	let totals = report.totals();
	info!(
		files = report.processed(),
		documents = totals.documents,
		labels_written = totals.labels_written,
		"Processing complete!"
	);

	Ok(ExitCode::SUCCESS)
}
