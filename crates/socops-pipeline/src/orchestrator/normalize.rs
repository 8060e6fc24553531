//! Provider output parsing.
//!
//! Providers answer with a JSON object, sometimes wrapped in a code fence or
//! preceded by prose, and not always with the same key names. Everything is
//! folded into one [`ChannelVariant`] here.

use serde_json::{Map, Value};
use socops_core::ChannelVariant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no JSON object in generator output")]
    NoJson,

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("generator output has no caption")]
    MissingCaption,
}

const CAPTION_KEYS: [&str; 4] = ["caption", "description", "text", "body"];
const HASHTAG_KEYS: [&str; 2] = ["hashtags", "tags"];
const TITLE_KEYS: [&str; 2] = ["title", "headline"];
const VISUAL_KEYS: [&str; 2] = ["visual_brief", "visual"];
const CTA_KEYS: [&str; 2] = ["cta", "call_to_action"];

/// Parse raw generator output into a variant. UTM fields are left empty.
///
/// # Errors
///
/// Returns [`NormalizeError`] when no JSON object can be found or parsed, or
/// when the object carries no caption.
pub fn parse_generated(raw: &str) -> Result<ChannelVariant, NormalizeError> {
    let json = extract_object(raw).ok_or(NormalizeError::NoJson)?;
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(obj) = value else {
        return Err(NormalizeError::NoJson);
    };

    let caption = first_string(&obj, &CAPTION_KEYS).ok_or(NormalizeError::MissingCaption)?;

    Ok(ChannelVariant {
        caption,
        hashtags: HASHTAG_KEYS
            .iter()
            .find_map(|k| obj.get(*k))
            .map(normalize_hashtags)
            .unwrap_or_default(),
        title: first_string(&obj, &TITLE_KEYS),
        format: first_string(&obj, &["format"]).map(|f| f.to_lowercase()),
        call_to_action: first_string(&obj, &CTA_KEYS),
        visual_brief: first_string(&obj, &VISUAL_KEYS),
        utm: None,
    })
}

/// Slice from the first `{` to the last `}`.
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts a list or a whitespace/comma separated string. Output tags carry
/// a single leading `#` and keep first-seen order without duplicates.
fn normalize_hashtags(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(split_tags)
            .collect(),
        Value::String(s) => split_tags(s).collect(),
        _ => Vec::new(),
    };

    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = format!("#{tag}");
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    out
}

fn split_tags(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim_start_matches('#').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
