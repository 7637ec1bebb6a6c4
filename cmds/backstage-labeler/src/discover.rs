//! Manifest file discovery.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Extensions of the files picked up when walking a directory
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Debug, Error)]
pub enum TargetError {
	#[error("`{0}` does not exist")]
	NotFound(PathBuf),

	#[error("`{0}` is not a valid file or directory")]
	Unsupported(PathBuf),
}

/// What the command line target turned out to be
#[derive(Debug, PartialEq, Eq)]
pub enum Target {
	/// A single file, processed regardless of its extension
	File(PathBuf),
	/// Manifest files found under a directory
	Directory { root: PathBuf, files: Vec<PathBuf> },
}

impl Target {
	pub fn files(&self) -> &[PathBuf] {
		match self {
			Self::File(path) => std::slice::from_ref(path),
			Self::Directory { files, .. } => files,
		}
	}
}

/// Resolve the command line target into the files to process.
pub fn resolve_target(target: &Path) -> Result<Target, TargetError> {
	if !target.exists() {
		return Err(TargetError::NotFound(target.to_path_buf()));
	}
	if target.is_file() {
		Ok(Target::File(target.to_path_buf()))
	} else if target.is_dir() {
		Ok(Target::Directory {
			root: target.to_path_buf(),
			files: find_manifests(target),
		})
	} else {
		Err(TargetError::Unsupported(target.to_path_buf()))
	}
}

/// Recursively collect `*.yaml` and `*.yml` files under `dir`, sorted by path.
///
/// Symlinks to files are picked up, symlinked directories are not descended
/// into. Unreadable entries are logged and skipped.
pub fn find_manifests(dir: &Path) -> Vec<PathBuf> {
	let mut files = Vec::new();
	for entry in WalkDir::new(dir).sort_by_file_name() {
		let entry = match entry {
			Ok(entry) => entry,
			Err(err) => {
				warn!("skipping unreadable entry: {err}");
				continue;
			}
		};
		if entry.path().is_file() && is_manifest(entry.path()) {
			trace!("found manifest file: {}", entry.path().display());
			files.push(entry.into_path());
		}
	}
	files
}

fn is_manifest(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext))
}
