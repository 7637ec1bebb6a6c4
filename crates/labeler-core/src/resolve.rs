//! Metadata resolution.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::{config::FieldConfig, metadata::MetadataStore};

/// Resolve every field of `service` to a label value.
///
/// Fields missing from the service record, and all fields of a service missing
/// from the store, resolve to their configured default. Never fails.
pub fn resolve(
	store: &MetadataStore,
	service: &str,
	fields: &[FieldConfig],
) -> IndexMap<String, String> {
	let record = store.service(service);
	fields
		.iter()
		.map(|field| {
			let value = record
				.and_then(|record| record.get(&field.name))
				.map_or_else(|| field.default.clone(), stringify_value);
			(field.name.clone(), value)
		})
		.collect()
}

/// Canonical string form of a metadata value.
///
/// Strings are taken verbatim. Anything else (numbers, booleans, null, arrays
/// and objects) becomes compact JSON, with object keys in source order.
pub fn stringify_value(value: &JsonValue) -> String {
	match value {
		JsonValue::String(s) => s.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	fn store() -> MetadataStore {
		MetadataStore::from_json(
			r#"{"checkout": {"team": "payments", "tier": 1, "oncall": null}}"#,
		)
		.unwrap()
	}

	fn fields() -> Vec<FieldConfig> {
		vec![
			FieldConfig::new("team", "unknown"),
			FieldConfig::new("tier", "3"),
			FieldConfig::new("slack", "none"),
			FieldConfig::new("oncall", "nobody"),
		]
	}

	#[test]
	fn test_known_service() {
		let resolved = resolve(&store(), "checkout", &fields());

		assert_eq!(
			resolved.into_iter().collect::<Vec<_>>(),
			vec![
				("team".to_string(), "payments".to_string()),
				("tier".to_string(), "1".to_string()),
				("slack".to_string(), "none".to_string()),
				("oncall".to_string(), "null".to_string()),
			]
		);
	}

	#[test]
	fn test_unknown_service_resolves_to_defaults() {
		let resolved = resolve(&store(), "unlisted", &fields());

		for field in fields() {
			assert_eq!(resolved[&field.name], field.default);
		}
	}

	#[test]
	fn test_no_fields() {
		assert!(resolve(&store(), "checkout", &[]).is_empty());
	}

	#[rstest]
	#[case::string(json!("payments"), "payments")]
	#[case::integer(json!(7), "7")]
	#[case::float(json!(1.5), "1.5")]
	#[case::boolean(json!(false), "false")]
	#[case::null(json!(null), "null")]
	#[case::array(json!(["a", "b"]), r#"["a","b"]"#)]
	#[case::object(json!({"z": 1, "a": [true]}), r#"{"z":1,"a":[true]}"#)]
	fn test_stringify_value(#[case] value: JsonValue, #[case] expected: &str) {
		assert_eq!(stringify_value(&value), expected);
	}
}
