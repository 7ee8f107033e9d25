//! YAML front matter.
//!
//! ```text
//! ---            ← must be the very first line
//! title: Hello
//! template: post
//! ---            ← or `...`
//! body starts here
//! ```
//!
//! A document without an opening fence, or whose fence is never closed, has
//! no front matter and is returned unchanged.

use serde_json::Value;

/// Arbitrary key/value attributes of a text file.
pub type Attributes = serde_json::Map<String, Value>;

/// A text file split into attributes and body.
#[derive(Debug, Default, PartialEq)]
pub struct FrontMatter<'a> {
    pub attributes: Attributes,
    pub body: &'a str,
}

/// Split off and parse the front matter block of `text`.
///
/// Returns an error message when the header exists but is not a YAML mapping.
pub fn parse(text: &str) -> Result<FrontMatter<'_>, String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some((yaml, body)) = split(text) else {
        return Ok(FrontMatter {
            attributes: Attributes::new(),
            body: text,
        });
    };

    if yaml.trim().is_empty() {
        return Ok(FrontMatter {
            attributes: Attributes::new(),
            body,
        });
    }

    let value: Option<Value> = serde_yaml_ng::from_str(yaml).map_err(|e| e.to_string())?;
    let attributes = match value {
        None | Some(Value::Null) => Attributes::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(format!(
                "front matter must be a mapping, found {}",
                type_name(&other)
            ));
        }
    };

    Ok(FrontMatter { attributes, body })
}

/// Locate the fenced header, returning `(yaml, body)`.
fn split(text: &str) -> Option<(&str, &str)> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let fence = line.trim_end();
        if fence == "---" || fence == "..." {
            return Some((&text[yaml_start..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
