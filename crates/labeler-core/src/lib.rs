//! Label resolution and merge engine for Kubernetes manifests.
//!
//! Each manifest carries a lookup label (`servicename` by default) naming the
//! service it belongs to. The service's record in a [`MetadataStore`] is turned
//! into prefixed labels, which are merged into `metadata.labels` together with
//! the configured static labels.

pub mod config;
pub mod document;
pub mod merge;
pub mod metadata;
pub mod process;
pub mod resolve;

pub use config::{Config, ConfigError, FieldConfig};
pub use document::Document;
pub use merge::{merge, LabelChanges, MergeOutcome};
pub use metadata::{MetadataError, MetadataStore};
pub use process::{
	process_batch, process_file, process_unit, BatchReport, ProcessContext, ProcessError,
	ProcessedUnit, UnitResult, UnitSummary,
};
pub use resolve::{resolve, stringify_value};
