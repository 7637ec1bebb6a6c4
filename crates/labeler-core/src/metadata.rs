//! Per-service metadata store.
//!
//! The store is a JSON object mapping service names to records of arbitrary
//! field values:
//!
//! ```json
//! { "checkout": { "team": "payments", "tier": 1 } }
//! ```

use std::{
	collections::HashMap,
	fs, io,
	path::{Path, PathBuf},
};

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use tracing::{debug, warn};

/// Field values of a single service
pub type ServiceRecord = Map<String, JsonValue>;

#[derive(Debug, Error)]
pub enum MetadataError {
	#[error("metadata file `{0}` not found")]
	NotFound(PathBuf),

	#[error("failed to read metadata file `{path}`: {source}")]
	Read { path: PathBuf, source: io::Error },

	#[error("failed to parse metadata: {0}")]
	Parse(#[from] serde_json::Error),
}

/// Immutable mapping from service name to its metadata record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
	services: HashMap<String, ServiceRecord>,
}

impl MetadataStore {
	/// Load the store, falling back to an empty one on any error.
	///
	/// With an empty store every service resolves to its field defaults.
	pub fn load(path: &Path) -> Self {
		match Self::from_file(path) {
			Ok(store) => {
				debug!(path = %path.display(), services = store.len(), "loaded metadata");
				store
			}
			Err(MetadataError::NotFound(path)) => {
				warn!(
					"metadata file `{}` not found, using default labels",
					path.display()
				);
				Self::default()
			}
			Err(err) => {
				warn!(path = %path.display(), "{err}, using default labels");
				Self::default()
			}
		}
	}

	pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
		let content = match fs::read_to_string(path) {
			Ok(content) => content,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(MetadataError::NotFound(path.to_path_buf()))
			}
			Err(source) => {
				return Err(MetadataError::Read {
					path: path.to_path_buf(),
					source,
				})
			}
		};
		Self::from_json(&content)
	}

	/// Parse store contents. Every service entry must be a JSON object.
	pub fn from_json(content: &str) -> Result<Self, MetadataError> {
		let services: HashMap<String, ServiceRecord> = serde_json::from_str(content)?;
		Ok(Self { services })
	}

	pub fn service(&self, name: &str) -> Option<&ServiceRecord> {
		self.services.get(name)
	}

	pub fn len(&self) -> usize {
		self.services.len()
	}

	pub fn is_empty(&self) -> bool {
		self.services.is_empty()
	}
}

impl FromIterator<(String, ServiceRecord)> for MetadataStore {
	fn from_iter<T: IntoIterator<Item = (String, ServiceRecord)>>(iter: T) -> Self {
		Self {
			services: iter.into_iter().collect(),
		}
	}
}
