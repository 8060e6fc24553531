//! Deterministic campaign-tagged links.
//!
//! Every value is a pure function of its inputs: the same request always
//! yields the same `full_url`, byte for byte, which is what lets A/B variant
//! tracking line up across tools.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::content::{Channel, Pillar};
use crate::week::IsoWeek;

/// Fixed medium for every social link.
pub const UTM_MEDIUM: &str = "social";

const MAX_ALIAS_LEN: usize = 30;
const DEFAULT_FORMAT: &str = "post";
const DEFAULT_VARIANT: &str = "default";

/// RFC 3986 unreserved characters stay as-is.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtmParams {
    pub campaign: String,
    pub content: String,
    pub source: String,
    pub medium: String,
}

impl UtmParams {
    /// Query pairs in their canonical order.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("utm_campaign", self.campaign.as_str()),
            ("utm_content", self.content.as_str()),
            ("utm_source", self.source.as_str()),
            ("utm_medium", self.medium.as_str()),
        ]
    }

    /// `true` when campaign, source and medium are all non-empty.
    #[must_use]
    pub fn is_attributable(&self) -> bool {
        !self.campaign.trim().is_empty()
            && !self.source.trim().is_empty()
            && !self.medium.trim().is_empty()
    }

    #[must_use]
    pub fn query_string(&self) -> String {
        self.pairs()
            .iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[derive(Debug, Clone)]
pub struct UtmRequest<'a> {
    pub path: &'a str,
    pub week: IsoWeek,
    pub pillar: Pillar,
    pub topic_alias: &'a str,
    pub channel: Channel,
    pub format: Option<&'a str>,
    pub variant: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmLink {
    pub base_url: String,
    pub path: String,
    pub params: UtmParams,
    pub full_url: String,
}

/// Build the campaign link for one channel variant.
#[must_use]
pub fn build_utm_link(base_url: &str, req: &UtmRequest<'_>) -> UtmLink {
    let format = req.format.unwrap_or(DEFAULT_FORMAT);
    let variant = req.variant.unwrap_or(DEFAULT_VARIANT);

    let params = UtmParams {
        campaign: campaign_name(req.week, req.pillar, req.topic_alias),
        content: format!(
            "{}_{}_{}",
            req.channel,
            format,
            variant_hash(req.channel, format, variant)
        ),
        source: req.channel.as_str().to_string(),
        medium: UTM_MEDIUM.to_string(),
    };

    let base_url = base_url.trim_end_matches('/').to_string();
    let path = normalize_path(req.path);
    let full_url = append_utm(&format!("{base_url}{path}"), &params);

    UtmLink {
        base_url,
        path,
        params,
        full_url,
    }
}

/// Append UTM parameters to an existing URL, keeping any query it has.
#[must_use]
pub fn append_utm(url: &str, params: &UtmParams) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{}", params.query_string())
}

/// `mktg_{2026w09}_{pillar}_{alias}`.
#[must_use]
pub fn campaign_name(week: IsoWeek, pillar: Pillar, topic_alias: &str) -> String {
    format!("mktg_{}_{}_{}", week.compact(), pillar, sanitize_alias(topic_alias))
}

/// Lower-case, `[a-z0-9-]` only, dash runs collapsed, at most 30 chars.
#[must_use]
pub fn sanitize_alias(alias: &str) -> String {
    let mut out = String::with_capacity(alias.len());
    for c in alias.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    let truncated: String = trimmed.chars().take(MAX_ALIAS_LEN).collect();
    let truncated = truncated.trim_end_matches('-');
    if truncated.is_empty() {
        "general".to_string()
    } else {
        truncated.to_string()
    }
}

/// First 8 hex chars of SHA-256 over `{channel}_{format}_{variant}`.
#[must_use]
pub fn variant_hash(channel: Channel, format: &str, variant: &str) -> String {
    let digest = Sha256::digest(format!("{channel}_{format}_{variant}").as_bytes());
    let hex = format!("{digest:x}");
    hex[..8].to_string()
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
