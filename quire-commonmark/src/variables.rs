//! Placeholder substitution.
//!
//! Two independent single-pass substitutions run on the source before it is
//! tokenized: `{{key}}` resolves against attributes supplied by the host page,
//! `$name` resolves against front-matter metadata. Unknown keys are left
//! verbatim and replacements are never rescanned.
use std::{borrow::Cow, sync::LazyLock};

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::{front_matter::Metadata, utils::never_matching_regex};

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\$([A-Za-z_][A-Za-z0-9_-]*)").unwrap_or_else(|e| {
    log::error!("Failed to compile VARIABLE_RE regex: {e}");
    never_matching_regex()
  })
});

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\{\{([A-Za-z0-9_.:-]+)\}\}").unwrap_or_else(|e| {
    log::error!("Failed to compile ATTRIBUTE_RE regex: {e}");
    never_matching_regex()
  })
});

/// Replace `$name` placeholders with metadata values.
#[must_use]
pub fn substitute_variables<'a>(
  text: &'a str,
  metadata: &Metadata,
) -> Cow<'a, str> {
  if metadata.is_empty() {
    return Cow::Borrowed(text);
  }

  VARIABLE_RE.replace_all(text, |caps: &Captures| {
    metadata
      .get_string(&caps[1])
      .unwrap_or_else(|| caps[0].to_string())
  })
}

/// Replace `{{key}}` placeholders with host attribute values.
#[must_use]
pub fn substitute_attributes<'a>(
  text: &'a str,
  attributes: &IndexMap<String, String>,
) -> Cow<'a, str> {
  if attributes.is_empty() {
    return Cow::Borrowed(text);
  }

  ATTRIBUTE_RE.replace_all(text, |caps: &Captures| {
    attributes
      .get(&caps[1])
      .cloned()
      .unwrap_or_else(|| caps[0].to_string())
  })
}
