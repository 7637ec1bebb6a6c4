//! Manifest document streams.
//!
//! Documents are kept as [`serde_yaml::Value`] trees. Mappings preserve
//! insertion order, so a document written back keeps its original key order
//! and newly merged labels land after the existing ones.
//!
//! Streams are written back with [`serde_saphyr`] instead of `serde_yaml`:
//! kubectl reads manifests as YAML 1.1, where plain `yes`, `on` or `no` are
//! booleans, and `serde_saphyr` quotes such strings.
//!
//! Integers outside the 64-bit range can't be represented in a
//! [`serde_yaml::Value`], so a stream containing one fails to parse.

use serde::Deserialize;
use serde_yaml::Value;

/// A single parsed manifest document.
pub type Document = Value;

/// Parse a multi-document YAML stream.
///
/// Null documents (empty `---` sections) are dropped, so they never reach the
/// merger and never show up in the output.
pub fn parse_stream(text: &str) -> Result<Vec<Document>, serde_yaml::Error> {
	serde_yaml::Deserializer::from_str(text)
		.map(Value::deserialize)
		.filter(|doc| !matches!(doc, Ok(Value::Null)))
		.collect()
}

/// Serialize documents as a block-style stream, each one introduced by an
/// explicit `---` marker.
///
/// An empty sequence serializes to an empty string.
pub fn write_stream(documents: &[Document]) -> Result<String, serde_saphyr::ser_error::Error> {
	let mut output = String::new();
	for document in documents {
		output.push_str("---\n");
		serde_saphyr::to_fmt_writer_with_options(&mut output, document, serializer_options())?;
		if !output.ends_with('\n') {
			output.push('\n');
		}
	}
	Ok(output)
}

/// Block style output close to what kubectl and helm produce
fn serializer_options() -> serde_saphyr::SerializerOptions {
	serde_saphyr::SerializerOptions {
		indent_step: 2,
		prefer_block_scalars: true,
		empty_as_braces: true,
		..Default::default()
	}
}

/// Text of a scalar value, as it would be used for a label value.
///
/// Returns `None` for nulls, sequences and mappings. Tags are looked through.
pub fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Bool(b) => Some(b.to_string()),
		Value::Number(n) => Some(n.to_string()),
		Value::Tagged(tagged) => scalar_text(&tagged.value),
		Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
	}
}
