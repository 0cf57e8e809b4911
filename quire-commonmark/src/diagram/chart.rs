use html_escape::encode_double_quoted_attribute;
use serde_yaml::Value;

use super::DiagramError;

/// Keys copied onto the chart element, in output order.
const ATTRIBUTE_KEYS: &[&str] = &[
  "type",
  "width",
  "height",
  "orientation",
  "monochrome",
  "color",
  "line-width",
  "radius",
  "min-radius",
  "max-radius",
  "labels",
];

fn attribute_value(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::Bool(b) => Some(b.to_string()),
    Value::Number(n) => Some(n.to_string()),
    Value::String(s) => Some(s.clone()),
    Value::Sequence(items) => {
      Some(
        items
          .iter()
          .filter_map(attribute_value)
          .collect::<Vec<_>>()
          .join(","),
      )
    },
    Value::Mapping(_) => serde_json::to_string(value).ok(),
    Value::Tagged(tagged) => attribute_value(&tagged.value),
  }
}

/// Render a `chart` block body as a `<dataroom-chart>` element.
///
/// # Errors
///
/// Returns an error when the body is not valid YAML or not a mapping.
pub fn render_chart(content: &str) -> Result<String, DiagramError> {
  let value: Value = serde_yaml::from_str(content.trim())?;
  let Value::Mapping(config) = value else {
    return Err(DiagramError::NotAMapping);
  };

  let mut html = String::from("<dataroom-chart");
  for key in ATTRIBUTE_KEYS {
    let Some(value) = config.get(*key).and_then(attribute_value) else {
      continue;
    };
    html.push_str(&format!(
      " {key}=\"{}\"",
      encode_double_quoted_attribute(&value)
    ));
  }
  html.push('>');

  if let Some(data) = config.get("data").filter(|d| !d.is_null()) {
    let json = serde_json::to_string(data).unwrap_or_default();
    html.push_str(&html_escape::encode_text(&json));
  }

  html.push_str("</dataroom-chart>\n");
  Ok(html)
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used, reason = "Fine in tests")]
  use super::*;

  #[test]
  fn test_chart_attributes_and_data() {
    let html = render_chart(
      "type: bar\nwidth: 400\nmonochrome: false\nlabels: [a, b]\ndata:\n  - \
       [1, 2]\n",
    )
    .unwrap();
    assert_eq!(
      html,
      "<dataroom-chart type=\"bar\" width=\"400\" monochrome=\"false\" \
       labels=\"a,b\">[[1,2]]</dataroom-chart>\n"
    );
  }

  #[test]
  fn test_attribute_order_is_fixed() {
    let html = render_chart("height: 2\ntype: line\n").unwrap();
    assert!(html.starts_with("<dataroom-chart type=\"line\" height=\"2\">"));
  }

  #[test]
  fn test_chart_errors() {
    assert!(matches!(
      render_chart("[unclosed"),
      Err(DiagramError::Yaml(_))
    ));
    assert!(matches!(
      render_chart("- just\n- a list"),
      Err(DiagramError::NotAMapping)
    ));
  }
}
