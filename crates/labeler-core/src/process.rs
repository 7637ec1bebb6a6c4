//! Document processing: single streams, files, and batches of files.
//!
//! Files are processed strictly one after another. A failure on one file is
//! recorded in the [`BatchReport`] and never stops the batch.

use std::{
	fs,
	io::{self, Write},
	path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
	config::Config,
	document::{parse_stream, write_stream},
	merge::{merge, MergeOutcome},
	metadata::MetadataStore,
};

/// Read-only state shared by every unit of a run.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
	pub config: &'a Config,
	pub store: &'a MetadataStore,
}

impl<'a> ProcessContext<'a> {
	pub fn new(config: &'a Config, store: &'a MetadataStore) -> Self {
		Self { config, store }
	}
}

#[derive(Debug, Error)]
pub enum ProcessError {
	#[error("failed to read file: {0}")]
	Read(#[source] io::Error),

	#[error("failed to parse YAML: {0}")]
	Parse(#[source] serde_yaml::Error),

	#[error("failed to serialize YAML: {0}")]
	Serialize(#[source] serde_saphyr::ser_error::Error),

	#[error("failed to write file: {0}")]
	Write(#[source] io::Error),
}

/// Counts for one processed unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitSummary {
	/// Non-null documents in the stream
	pub documents: usize,
	/// Documents that went through label resolution
	pub labeled: usize,
	/// Documents without a usable lookup label
	pub missing_lookup: usize,
	/// Labels written across all documents
	pub labels_written: usize,
}

impl UnitSummary {
	fn record(&mut self, outcome: MergeOutcome) {
		self.documents += 1;
		match outcome {
			MergeOutcome::NotAManifest => {}
			MergeOutcome::MissingLookupLabel => self.missing_lookup += 1,
			MergeOutcome::Labeled(changes) => {
				self.labeled += 1;
				self.labels_written += changes.written;
			}
		}
	}
}

/// Rewritten stream text together with its counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedUnit {
	pub text: String,
	pub summary: UnitSummary,
}

/// Label every document of a YAML stream.
///
/// Null documents are dropped; the rest keep their relative order. Nothing is
/// produced if the stream fails to parse.
pub fn process_unit(text: &str, ctx: ProcessContext<'_>) -> Result<ProcessedUnit, ProcessError> {
	let mut documents = parse_stream(text).map_err(ProcessError::Parse)?;
	let mut summary = UnitSummary::default();
	for document in &mut documents {
		summary.record(merge(document, ctx.config, ctx.store));
	}
	let text = write_stream(&documents).map_err(ProcessError::Serialize)?;
	Ok(ProcessedUnit { text, summary })
}

/// Label a manifest file in place.
///
/// The file is only replaced once the whole stream has been processed, so a
/// failing file is left as it was.
pub fn process_file(path: &Path, ctx: ProcessContext<'_>) -> Result<UnitSummary, ProcessError> {
	let text = fs::read_to_string(path).map_err(ProcessError::Read)?;
	let processed = process_unit(&text, ctx)?;
	replace_file(path, &processed.text).map_err(ProcessError::Write)?;
	Ok(processed.summary)
}

/// Write `contents` to a temporary file next to `path` and rename it over
/// `path`, keeping the original permissions. Symlinks are written through.
fn replace_file(path: &Path, contents: &str) -> io::Result<()> {
	let path = fs::canonicalize(path)?;
	let dir = path.parent().unwrap_or_else(|| Path::new("."));
	let permissions = fs::metadata(&path)?.permissions();

	let mut file = NamedTempFile::new_in(dir)?;
	file.write_all(contents.as_bytes())?;
	file.as_file().sync_all()?;
	fs::set_permissions(file.path(), permissions)?;
	file.persist(&path).map_err(|err| err.error)?;
	Ok(())
}

/// Outcome of a single file in a batch.
#[derive(Debug)]
pub struct UnitResult {
	pub path: PathBuf,
	pub outcome: Result<UnitSummary, ProcessError>,
}

/// Outcome of a whole batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
	pub results: Vec<UnitResult>,
}

impl BatchReport {
	pub fn is_empty(&self) -> bool {
		self.results.is_empty()
	}

	/// Number of files processed successfully
	pub fn processed(&self) -> usize {
		self.results.iter().filter(|r| r.outcome.is_ok()).count()
	}

	pub fn failed(&self) -> usize {
		self.results.len() - self.processed()
	}

	pub fn failures(&self) -> impl Iterator<Item = (&Path, &ProcessError)> {
		self.results
			.iter()
			.filter_map(|r| r.outcome.as_ref().err().map(|e| (r.path.as_path(), e)))
	}

	/// Sum of the counts of all successful files
	pub fn totals(&self) -> UnitSummary {
		self.results
			.iter()
			.filter_map(|r| r.outcome.as_ref().ok())
			.fold(UnitSummary::default(), |acc, s| UnitSummary {
				documents: acc.documents + s.documents,
				labeled: acc.labeled + s.labeled,
				missing_lookup: acc.missing_lookup + s.missing_lookup,
				labels_written: acc.labels_written + s.labels_written,
			})
	}
}

/// Process every file in order, continuing past failures.
pub fn process_batch(paths: &[PathBuf], ctx: ProcessContext<'_>) -> BatchReport {
	let mut report = BatchReport::default();
	for path in paths {
		info!("Processing: {}", path.display());
		let outcome = process_file(path, ctx);
		match &outcome {
			Ok(summary) => debug!(
				path = %path.display(),
				documents = summary.documents,
				labeled = summary.labeled,
				labels_written = summary.labels_written,
				"processed file"
			),
			Err(err) => warn!("failed to process file `{}`: {err}", path.display()),
		}
		report.results.push(UnitResult {
			path: path.clone(),
			outcome,
		});
	}
	report
}
