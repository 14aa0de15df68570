//! YAML frontmatter extraction.
//!
//! A content file opens with a `---` line, a YAML block, and a closing
//! `---` line:
//!
//! ```text
//! ---
//! title: Spring Fest
//! audience: all
//! send_notification: true
//! ---
//! Body text.
//! ```
//!
//! Extraction never fails. An unreadable file, a missing delimiter or
//! malformed YAML is logged and yields an empty [`Frontmatter`], which the
//! dispatcher then treats as "no instructions".

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::Error;

const DELIMITER: &str = "---";

/// Frontmatter fields that drive a notification. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub push_message: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub segment_tag: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,

    #[serde(
        deserialize_with = "subscriber_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub specific_subscribers: Vec<String>,

    #[serde(deserialize_with = "flag", skip_serializing_if = "Option::is_none")]
    pub send_now: Option<bool>,

    #[serde(deserialize_with = "flag", skip_serializing_if = "Option::is_none")]
    pub send_notification: Option<bool>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl Frontmatter {
    /// Push text: `push_message`, then `message`, then `preview`.
    pub fn message_text(&self) -> Option<&str> {
        first_present(&[&self.push_message, &self.message, &self.preview])
    }

    /// Segment tag: `segment_tag`, then `segment`.
    pub fn segment_name(&self) -> Option<&str> {
        first_present(&[&self.segment_tag, &self.segment])
    }

    /// Stable identifier: `id`, then `slug`.
    pub fn identifier(&self) -> Option<&str> {
        first_present(&[&self.id, &self.slug])
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn first_present<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields.iter().find_map(|f| f.as_deref())
}

/// Read a file and parse its frontmatter.
pub fn parse_frontmatter(path: &Path) -> Frontmatter {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read content file");
            return Frontmatter::default();
        }
    };

    let Some(block) = extract_block(&content) else {
        debug!(path = %path.display(), "No frontmatter block");
        return Frontmatter::default();
    };

    match parse_block(block) {
        Ok(frontmatter) => frontmatter,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid frontmatter");
            Frontmatter::default()
        }
    }
}

/// Return the text between the opening and closing `---` lines.
///
/// The opening delimiter must be the first line of the file.
fn extract_block(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let (first, rest) = split_line(content)?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let mut offset = 0;
    let mut remaining = rest;
    while !remaining.is_empty() {
        let (line, next) = match split_line(remaining) {
            Some(pair) => pair,
            None => (remaining, ""),
        };
        if line.trim_end() == DELIMITER {
            return Some(&rest[..offset]);
        }
        offset += remaining.len() - next.len();
        remaining = next;
    }
    None
}

/// Split off the first line, without its `\n`. `None` when there is no
/// newline at all.
fn split_line(text: &str) -> Option<(&str, &str)> {
    text.split_once('\n')
}

fn parse_block(block: &str) -> Result<Frontmatter, Error> {
    let value: Value = serde_yaml::from_str(block)?;
    match value {
        Value::Null => Ok(Frontmatter::default()),
        Value::Mapping(_) => Ok(serde_yaml::from_value(value)?),
        other => Err(Error::other(format!(
            "expected a mapping, found {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Strings, numbers and booleans as trimmed text; anything else is absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// YAML truthiness, with the usual spellings of "no" counted as false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "no" | "off" | "0" | "n"
        ),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => truthy(&tagged.value),
    }
}

fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Some(truthy(&value)))
}

/// Accepts `[id, ...]`, `[{subscriber: id}, ...]` or a single id.
fn subscriber_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let ids = match &value {
        Value::Sequence(items) => items.iter().filter_map(subscriber_id).collect(),
        Value::Null => Vec::new(),
        single => subscriber_id(single).into_iter().collect(),
    };
    Ok(ids)
}

fn subscriber_id(item: &Value) -> Option<String> {
    match item {
        Value::Mapping(map) => ["subscriber", "sid"]
            .iter()
            .find_map(|key| map.get(*key).and_then(scalar_text)),
        other => scalar_text(other),
    }
}
