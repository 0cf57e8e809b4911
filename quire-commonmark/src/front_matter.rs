//! Leading YAML metadata blocks.
//!
//! A document may start with a block delimited by two lines that are exactly
//! `---`. The block is decoded as a YAML mapping and becomes the document's
//! [`Metadata`]; everything after the closing delimiter is the body.
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

/// Error raised when a front-matter block cannot be decoded.
#[derive(Debug, Error)]
pub enum FrontMatterError {
  #[error("Failed to decode front matter: {0}")]
  Decode(#[from] serde_yaml::Error),

  #[error("Front matter must be a mapping, found {0}")]
  NotAMapping(&'static str),
}

/// Key/value metadata declared in a document's front matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(IndexMap<String, Value>);

impl Metadata {
  /// Create an empty mapping.
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// Look up `key` and return its display form (see [`value_to_string`]).
  #[must_use]
  pub fn get_string(&self, key: &str) -> Option<String> {
    self.0.get(key).map(value_to_string)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: Value) {
    self.0.insert(key.into(), value);
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }
}

/// String form of a metadata value as used for `$name` substitution.
///
/// Strings are used verbatim, numbers and booleans in their display form,
/// null becomes the empty string and collections are serialized as JSON.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::String(s) => s.clone(),
    Value::Sequence(_) | Value::Mapping(_) => {
      serde_json::to_string(value).unwrap_or_default()
    },
    Value::Tagged(tagged) => value_to_string(&tagged.value),
  }
}

/// Split a leading front-matter block from `text`.
///
/// Returns the raw block (without delimiters) and the body, or `None` when
/// the text does not open with a complete block. Blank lines directly after
/// the closing delimiter are not part of the body.
#[must_use]
pub fn split_front_matter(text: &str) -> Option<(&str, &str)> {
  let mut lines = text.split_inclusive('\n');
  let first = lines.next()?;
  if first.trim_end_matches(['\r', '\n']) != "---" {
    return None;
  }

  let start = first.len();
  let mut offset = start;
  for line in lines {
    if line.trim_end_matches(['\r', '\n']) == "---" {
      let raw = &text[start..offset];
      let body = skip_blank_lines(&text[offset + line.len()..]);
      return Some((raw, body));
    }
    offset += line.len();
  }

  None
}

fn skip_blank_lines(mut body: &str) -> &str {
  loop {
    match body.find('\n') {
      Some(end) if body[..end].trim().is_empty() => body = &body[end + 1..],
      Some(_) => return body,
      None if body.trim().is_empty() => return "",
      None => return body,
    }
  }
}

/// Decode the raw contents of a front-matter block.
///
/// # Errors
///
/// Returns [`FrontMatterError::Decode`] when the YAML is malformed and
/// [`FrontMatterError::NotAMapping`] when it decodes to something other than
/// a mapping. An empty block is an empty mapping.
pub fn parse_front_matter(raw: &str) -> Result<Metadata, FrontMatterError> {
  if raw.trim().is_empty() {
    return Ok(Metadata::new());
  }

  let value: Value = serde_yaml::from_str(raw)?;
  let mapping = match value {
    Value::Null => return Ok(Metadata::new()),
    Value::Mapping(mapping) => mapping,
    Value::Bool(_) => return Err(FrontMatterError::NotAMapping("a boolean")),
    Value::Number(_) => return Err(FrontMatterError::NotAMapping("a number")),
    Value::String(_) => return Err(FrontMatterError::NotAMapping("a string")),
    Value::Sequence(_) => {
      return Err(FrontMatterError::NotAMapping("a sequence"));
    },
    Value::Tagged(_) => {
      return Err(FrontMatterError::NotAMapping("a tagged value"));
    },
  };

  let mut metadata = Metadata::new();
  for (key, value) in mapping {
    match key {
      Value::String(key) => metadata.insert(key, value),
      Value::Bool(_) | Value::Number(_) => {
        metadata.insert(value_to_string(&key), value);
      },
      other => warn!("Ignoring front matter entry with non-scalar key {other:?}"),
    }
  }

  Ok(metadata)
}

/// Extract front matter from `text`, returning the metadata and the body.
///
/// Without a front-matter block the metadata is empty and the body is the
/// unchanged input. A block that fails to decode is logged and treated as
/// empty; the body is still separated from it.
#[must_use]
pub fn extract_front_matter(text: &str) -> (Metadata, &str) {
  let Some((raw, body)) = split_front_matter(text) else {
    return (Metadata::new(), text);
  };

  match parse_front_matter(raw) {
    Ok(metadata) => (metadata, body),
    Err(e) => {
      warn!("{e}");
      (Metadata::new(), body)
    },
  }
}
