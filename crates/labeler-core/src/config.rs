//! Labeler configuration.
//!
//! The configuration is read from a YAML file once at startup:
//!
//! ```yaml
//! label_prefix: molops.net
//! metadata:
//!   source_file: services-metadata.json
//!   lookup_label: servicename
//! fields:
//!   - name: team
//!     default: unknown
//! static_labels:
//!   molops.net/managed-by: backstage-labeler
//! options:
//!   preserve_existing: true
//!   verbose: false
//! ```
//!
//! Keys missing from the file take the built-in defaults. A file that cannot be
//! read or parsed is discarded as a whole, see [`Config::load`].

use std::{
	collections::HashSet,
	fs, io,
	path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::scalar_text;

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_LABEL_PREFIX: &str = "molops.net";
pub const DEFAULT_METADATA_SOURCE_FILE: &str = "services-metadata.json";
pub const DEFAULT_LOOKUP_LABEL: &str = "servicename";
/// Fallback value of a field that doesn't configure its own default
pub const DEFAULT_FIELD_VALUE: &str = "unset";

/// Errors that can occur when loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("config file `{0}` not found")]
	NotFound(PathBuf),

	#[error("failed to read config file `{path}`: {source}")]
	Read { path: PathBuf, source: io::Error },

	#[error("failed to parse config: {0}")]
	Parse(#[from] serde_yaml::Error),

	#[error("field `{0}` is configured more than once")]
	DuplicateField(String),
}

/// A metadata field turned into a `<label_prefix>/<name>` label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldConfig {
	/// Field name, both in the metadata record and in the label key
	pub name: String,

	/// Value used when the service or the field is missing from the metadata.
	/// A field resolving to this value is not written as a label.
	#[serde(
		default = "default_field_value",
		deserialize_with = "deserialize_scalar"
	)]
	pub default: String,

	/// Informational only, the merge never enforces it
	#[serde(default = "default_required")]
	pub required: bool,
}

impl FieldConfig {
	pub fn new(name: impl Into<String>, default: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			default: default.into(),
			required: true,
		}
	}
}

/// Immutable labeler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// Prefix of every field label key
	pub label_prefix: String,
	/// JSON file holding the per-service metadata
	pub metadata_source_file: PathBuf,
	/// Existing label whose value names the service
	pub lookup_label: String,
	/// Fields to resolve, in label write order
	pub fields: Vec<FieldConfig>,
	/// Labels written verbatim after the field labels, in this order
	pub static_labels: IndexMap<String, String>,
	/// Never overwrite a label that is already present when it is written
	pub preserve_existing: bool,
	/// Report every per-document decision
	pub verbose: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
			metadata_source_file: PathBuf::from(DEFAULT_METADATA_SOURCE_FILE),
			lookup_label: DEFAULT_LOOKUP_LABEL.to_string(),
			fields: Vec::new(),
			static_labels: IndexMap::new(),
			preserve_existing: true,
			verbose: false,
		}
	}
}

impl Config {
	/// Load the config file, falling back to [`Config::default`] on any error.
	///
	/// There is no partial merge: one bad key discards the whole file.
	pub fn load(path: &Path) -> Self {
		match Self::from_file(path) {
			Ok(config) => {
				debug!(
					path = %path.display(),
					fields = config.fields.len(),
					static_labels = config.static_labels.len(),
					"loaded config"
				);
				config
			}
			Err(ConfigError::NotFound(path)) => {
				warn!("config file `{}` not found, using defaults", path.display());
				Self::default()
			}
			Err(err) => {
				warn!(path = %path.display(), "{err}, using defaults");
				Self::default()
			}
		}
	}

	/// Read and parse a config file.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let content = match fs::read_to_string(path) {
			Ok(content) => content,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(ConfigError::NotFound(path.to_path_buf()))
			}
			Err(source) => {
				return Err(ConfigError::Read {
					path: path.to_path_buf(),
					source,
				})
			}
		};
		Self::from_yaml(&content)
	}

	/// Parse config file contents. An empty document yields the defaults.
	pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
		if content.trim().is_empty() {
			return Ok(Self::default());
		}
		let raw: Option<RawConfig> = serde_yaml::from_str(content)?;
		raw.unwrap_or_default().into_config()
	}

	/// Key of the label written for `field`.
	pub fn label_key(&self, field: &FieldConfig) -> String {
		format!("{}/{}", self.label_prefix, field.name)
	}
}

/// Config file layout, before defaults are applied
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
	label_prefix: Option<String>,
	metadata: Option<RawMetadataSection>,
	fields: Option<Vec<FieldConfig>>,
	#[serde(deserialize_with = "deserialize_label_map")]
	static_labels: Option<IndexMap<String, String>>,
	options: Option<RawOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadataSection {
	source_file: Option<PathBuf>,
	lookup_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOptions {
	preserve_existing: Option<bool>,
	verbose: Option<bool>,
}

impl RawConfig {
	fn into_config(self) -> Result<Config, ConfigError> {
		let defaults = Config::default();
		let metadata = self.metadata.unwrap_or_default();
		let options = self.options.unwrap_or_default();
		let fields = self.fields.unwrap_or_default();

		let mut seen = HashSet::new();
		for field in &fields {
			if !seen.insert(field.name.as_str()) {
				return Err(ConfigError::DuplicateField(field.name.clone()));
			}
		}

		Ok(Config {
			label_prefix: self.label_prefix.unwrap_or(defaults.label_prefix),
			metadata_source_file: metadata
				.source_file
				.unwrap_or(defaults.metadata_source_file),
			lookup_label: metadata.lookup_label.unwrap_or(defaults.lookup_label),
			fields,
			static_labels: self.static_labels.unwrap_or_default(),
			preserve_existing: options
				.preserve_existing
				.unwrap_or(defaults.preserve_existing),
			verbose: options.verbose.unwrap_or(defaults.verbose),
		})
	}
}

fn default_field_value() -> String {
	DEFAULT_FIELD_VALUE.to_string()
}

fn default_required() -> bool {
	true
}

/// Accept any scalar (`0`, `true`, `v1`) where a string is expected
fn deserialize_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	let value = serde_yaml::Value::deserialize(deserializer)?;
	scalar_text(&value).ok_or_else(|| de::Error::custom("expected a scalar value"))
}

fn deserialize_label_map<'de, D>(
	deserializer: D,
) -> Result<Option<IndexMap<String, String>>, D::Error>
where
	D: Deserializer<'de>,
{
	let Some(raw) = Option::<IndexMap<String, serde_yaml::Value>>::deserialize(deserializer)?
	else {
		return Ok(None);
	};
	raw.into_iter()
		.map(|(key, value)| match scalar_text(&value) {
			Some(value) => Ok((key, value)),
			None => Err(de::Error::custom(format!(
				"static label `{key}` must have a scalar value"
			))),
		})
		.collect::<Result<_, _>>()
		.map(Some)
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_full_config() {
		let config = Config::from_yaml(indoc! {"
			label_prefix: example.com
			metadata:
			  source_file: meta/services.json
			  lookup_label: app
			fields:
			  - name: team
			    default: unknown
			  - name: tier
			    required: false
			static_labels:
			  example.com/managed-by: labeler
			  example.com/audited: true
			options:
			  preserve_existing: false
			  verbose: true
		"})
		.unwrap();

		assert_eq!(config.label_prefix, "example.com");
		assert_eq!(
			config.metadata_source_file,
			PathBuf::from("meta/services.json")
		);
		assert_eq!(config.lookup_label, "app");
		assert_eq!(
			config.fields,
			vec![
				FieldConfig::new("team", "unknown"),
				FieldConfig {
					name: "tier".to_string(),
					default: "unset".to_string(),
					required: false,
				},
			]
		);
		assert_eq!(
			config.static_labels.iter().collect::<Vec<_>>(),
			vec![
				(
					&"example.com/managed-by".to_string(),
					&"labeler".to_string()
				),
				(&"example.com/audited".to_string(), &"true".to_string()),
			]
		);
		assert!(!config.preserve_existing);
		assert!(config.verbose);
	}

	#[test]
	fn test_missing_keys_take_defaults() {
		let config = Config::from_yaml(indoc! {"
			fields:
			  - name: team
			    default: 0
		"})
		.unwrap();

		assert_eq!(config.label_prefix, DEFAULT_LABEL_PREFIX);
		assert_eq!(config.lookup_label, DEFAULT_LOOKUP_LABEL);
		assert_eq!(
			config.metadata_source_file,
			PathBuf::from(DEFAULT_METADATA_SOURCE_FILE)
		);
		assert_eq!(config.fields, vec![FieldConfig::new("team", "0")]);
		assert!(config.static_labels.is_empty());
		assert!(config.preserve_existing);
		assert!(!config.verbose);
	}

	#[test]
	fn test_empty_file_is_default() {
		assert_eq!(Config::from_yaml("\n").unwrap(), Config::default());
	}

	#[test]
	fn test_field_without_name_is_rejected() {
		let err = Config::from_yaml("fields:\n  - default: x\n").unwrap_err();
		assert_matches!(err, ConfigError::Parse(_));
	}

	#[test]
	fn test_duplicate_fields_are_rejected() {
		let err = Config::from_yaml("fields:\n  - name: team\n  - name: team\n").unwrap_err();
		assert_matches!(err, ConfigError::DuplicateField(name) if name == "team");
	}

	#[test]
	fn test_structured_static_label_is_rejected() {
		let err = Config::from_yaml("static_labels:\n  a: [1, 2]\n").unwrap_err();
		assert_matches!(err, ConfigError::Parse(_));
	}

	#[test]
	fn test_label_key() {
		let config = Config::default();
		assert_eq!(
			config.label_key(&FieldConfig::new("team", "unknown")),
			"molops.net/team"
		);
	}

	#[test]
	fn test_load_missing_file_falls_back_to_defaults() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("config.yaml");

		assert_matches!(Config::from_file(&path), Err(ConfigError::NotFound(_)));
		assert_eq!(Config::load(&path), Config::default());
	}

	#[test]
	fn test_load_broken_file_discards_everything() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("config.yaml");
		fs::write(
			&path,
			indoc! {"
				label_prefix: example.com
				fields:
				  - default: no-name
			"},
		)
		.unwrap();

		assert_eq!(Config::load(&path), Config::default());
	}

	#[test]
	fn test_load_valid_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("config.yaml");
		fs::write(&path, "label_prefix: example.com\n").unwrap();

		let config = Config::load(&path);
		assert_eq!(config.label_prefix, "example.com");
	}
}
