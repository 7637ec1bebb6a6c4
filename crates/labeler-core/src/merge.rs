//! Label merging.
//!
//! Field labels are written before static labels. With `preserve_existing`,
//! a field label written in the same pass blocks a static label with the same
//! key.

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::{
	config::Config, document::scalar_text, metadata::MetadataStore, resolve::resolve,
};

/// What [`merge`] did to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
	/// Not a mapping with both `kind` and `metadata`, left untouched
	NotAManifest,
	/// No usable lookup label, no labels were written
	MissingLookupLabel,
	Labeled(LabelChanges),
}

/// Per-document label counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelChanges {
	/// Labels inserted or overwritten
	pub written: usize,
	/// Labels kept because `preserve_existing` is set
	pub preserved: usize,
	/// Field labels skipped because they resolved to their default
	pub defaulted: usize,
}

/// Merge metadata and static labels into `document.metadata.labels`.
///
/// Never fails: anything missing from the document or the store degrades to a
/// no-op or to field defaults.
pub fn merge(document: &mut Value, config: &Config, store: &MetadataStore) -> MergeOutcome {
	let Value::Mapping(root) = document else {
		return MergeOutcome::NotAManifest;
	};
	if !root.contains_key("kind") {
		return MergeOutcome::NotAManifest;
	}
	let Some(Value::Mapping(metadata)) = root.get_mut("metadata") else {
		return MergeOutcome::NotAManifest;
	};
	let Some(labels) = ensure_labels(metadata) else {
		return MergeOutcome::NotAManifest;
	};

	let Some(service) = lookup_value(labels, &config.lookup_label) else {
		if config.verbose {
			info!(
				"skipping resource (no `{}` label found)",
				config.lookup_label
			);
		}
		return MergeOutcome::MissingLookupLabel;
	};

	let resolved = resolve(store, &service, &config.fields);
	let mut changes = LabelChanges::default();

	for field in &config.fields {
		let key = config.label_key(field);
		let value = resolved
			.get(&field.name)
			.map_or(field.default.as_str(), String::as_str);

		if config.preserve_existing {
			if let Some(existing) = labels.get(key.as_str()) {
				if config.verbose {
					info!(
						"preserving existing label: {key}={}",
						scalar_text(existing).unwrap_or_default()
					);
				}
				changes.preserved += 1;
				continue;
			}
		}
		if value == field.default {
			debug!(%service, label = %key, "field resolved to its default, not writing");
			changes.defaulted += 1;
			continue;
		}
		labels.insert(Value::String(key), Value::String(value.to_owned()));
		changes.written += 1;
	}

	for (key, value) in &config.static_labels {
		if config.preserve_existing && labels.contains_key(key.as_str()) {
			changes.preserved += 1;
			continue;
		}
		labels.insert(Value::String(key.clone()), Value::String(value.clone()));
		changes.written += 1;
	}

	MergeOutcome::Labeled(changes)
}

/// Make sure `metadata.labels` is a mapping.
///
/// Helm templates can produce `labels:` with no value, which parses as null;
/// that, and any other non-mapping value, is replaced with an empty mapping.
fn ensure_labels(metadata: &mut Mapping) -> Option<&mut Mapping> {
	let labels = metadata
		.entry(Value::from("labels"))
		.or_insert(Value::Mapping(Mapping::new()));
	if !labels.is_mapping() {
		*labels = Value::Mapping(Mapping::new());
	}
	labels.as_mapping_mut()
}

/// Service name from the lookup label, if set to a non-empty scalar
fn lookup_value(labels: &Mapping, lookup_label: &str) -> Option<String> {
	labels
		.get(lookup_label)
		.and_then(scalar_text)
		.filter(|value| !value.is_empty())
}
