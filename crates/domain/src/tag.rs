//! Zone tags: `key=value` pairs the operator stores in the DTS zone table.
//!
//! A raw tag looks like `row=1;column=2;layer=3;relay=A1,2;` (the trailing
//! separator is optional). Segments that do not split into exactly one key
//! and one value are rejected individually; the rest of the tag still decodes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TagError;
use crate::zone::{Coordinate, Relay};

/// Separator between `key=value` segments.
pub const TAG_SEPARATOR: char = ';';
/// Separator between a key and its value.
pub const TAG_VALUE_SEPARATOR: char = '=';

pub const TAG_WAREHOUSE: &str = "warehouse";
pub const TAG_GROUP: &str = "group";
pub const TAG_ROW: &str = "row";
pub const TAG_COLUMN: &str = "column";
pub const TAG_LAYER: &str = "layer";
pub const TAG_RELAY: &str = "relay";

const RELAY_OUTPUTS_PATTERN: &str = r"^([1-9]*[1-9][0-9]*,)+[1-9]*[1-9][0-9]*$";

static RELAY_OUTPUTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RELAY_OUTPUTS_PATTERN).expect("valid regex"));

/// Decoded tag map, ordered by key for stable output.
pub type Tags = BTreeMap<String, String>;

/// Split a raw tag into its segments, yielding an error for each malformed one.
///
/// Callers that want to report rejected segments iterate this directly;
/// [`decode_tags`] keeps only the valid pairs.
pub fn tag_segments(raw: &str) -> impl Iterator<Item = Result<(String, String), TagError>> + '_ {
    raw.strip_suffix(TAG_SEPARATOR)
        .unwrap_or(raw)
        .split(TAG_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let parts: Vec<&str> = segment.split(TAG_VALUE_SEPARATOR).collect();
            match parts.as_slice() {
                [key, value] => Ok(((*key).to_string(), (*value).to_string())),
                _ => Err(TagError::MalformedSegment(segment.to_string())),
            }
        })
}

/// Decode a raw tag, skipping malformed segments.
#[must_use]
pub fn decode_tags(raw: &str) -> Tags {
    tag_segments(raw).filter_map(Result::ok).collect()
}

/// Parse a relay tag value such as `A1,2,3`.
///
/// The first character is the relay group letter, the remainder the
/// comma-separated output indices.
///
/// # Errors
///
/// Returns [`TagError::RelayTooShort`] or [`TagError::RelayPattern`] when the
/// value does not describe a relay mapping.
pub fn parse_relay(value: &str) -> Result<Relay, TagError> {
    let mut chars = value.chars();
    let (Some(group), Some(_)) = (chars.next(), chars.clone().next()) else {
        return Err(TagError::RelayTooShort(value.to_string()));
    };
    let outputs = chars.as_str();
    if !RELAY_OUTPUTS_RE.is_match(outputs) {
        return Err(TagError::RelayPattern(value.to_string()));
    }
    Ok(Relay::new(group, outputs))
}

/// Build a warehouse [`Coordinate`] from decoded tags.
///
/// `row`, `column` and `layer` must be integers; `warehouse` and `group`
/// are free text and default to empty.
///
/// # Errors
///
/// Returns [`TagError::Coordinate`] naming the first field that is missing
/// or not an integer.
pub fn parse_coordinate(tags: &Tags) -> Result<Coordinate, TagError> {
    let int_field = |field: &'static str| -> Result<i32, TagError> {
        let value = tags.get(field).map(String::as_str).unwrap_or_default();
        value.trim().parse().map_err(|_| TagError::Coordinate {
            field,
            value: value.to_string(),
        })
    };

    Ok(Coordinate {
        warehouse: tags.get(TAG_WAREHOUSE).cloned().unwrap_or_default(),
        group: tags.get(TAG_GROUP).cloned().unwrap_or_default(),
        row: int_field(TAG_ROW)?,
        column: int_field(TAG_COLUMN)?,
        layer: int_field(TAG_LAYER)?,
    })
}
