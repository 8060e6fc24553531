//! Brand and compliance rules.
//!
//! A rule's payload is typed by its `rule_key` and validated once, when the
//! rule is loaded from YAML or from the store. Gate evaluation never sees a
//! malformed payload.

use std::collections::HashSet;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::Channel;
use crate::{ConfigError, CoreError};

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("unknown rule key '{0}'")]
    UnknownKey(String),

    #[error("rule '{rule_key}' has a malformed payload: {reason}")]
    InvalidPayload { rule_key: String, reason: String },

    #[error("rule '{rule_key}' has min {min} greater than max {max}")]
    InvalidRange {
        rule_key: &'static str,
        min: u32,
        max: u32,
    },

    #[error("rule '{rule_key}' has an empty '{field}' list")]
    EmptyList {
        rule_key: &'static str,
        field: &'static str,
    },

    #[error("rule 'anglicisms' has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("duplicate rule '{rule_key}' for scope '{scope}'")]
    Duplicate { rule_key: String, scope: RuleScope },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Tone,
    ForbiddenWord,
    RequiredElement,
    Legal,
    Visual,
    ClaimsPolicy,
}

impl RuleType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RuleType::Tone => "tone",
            RuleType::ForbiddenWord => "forbidden_word",
            RuleType::RequiredElement => "required_element",
            RuleType::Legal => "legal",
            RuleType::Visual => "visual",
            RuleType::ClaimsPolicy => "claims_policy",
        }
    }
}

impl std::str::FromStr for RuleType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tone" => Ok(RuleType::Tone),
            "forbidden_word" => Ok(RuleType::ForbiddenWord),
            "required_element" => Ok(RuleType::RequiredElement),
            "legal" => Ok(RuleType::Legal),
            "visual" => Ok(RuleType::Visual),
            "claims_policy" => Ok(RuleType::ClaimsPolicy),
            _ => Err(CoreError::UnknownVariant {
                kind: "rule type",
                value: s.to_string(),
            }),
        }
    }
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Block,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Block => "block",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "block" => Ok(Severity::Block),
            _ => Err(CoreError::UnknownVariant {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

/// Which posts a rule applies to: every channel, or a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleScope {
    All,
    Channel(Channel),
}

impl RuleScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RuleScope::All => "all",
            RuleScope::Channel(channel) => channel.as_str(),
        }
    }
}

impl std::fmt::Display for RuleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(RuleScope::All);
        }
        s.parse::<Channel>().map(RuleScope::Channel)
    }
}

impl TryFrom<String> for RuleScope {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleScope> for String {
    fn from(scope: RuleScope) -> Self {
        scope.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnglicismPattern {
    /// Case-insensitive regular expression.
    pub pattern: String,
    /// French replacement offered as a fix suggestion.
    #[serde(default)]
    pub replacement: Option<String>,
}

impl AnglicismPattern {
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if the pattern does not compile.
    pub fn regex(&self) -> Result<Regex, RuleError> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleError::InvalidPattern {
                pattern: self.pattern.clone(),
                source,
            })
    }
}

/// Payload of a rule, tagged by its `rule_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule_key", content = "payload", rename_all = "snake_case")]
pub enum RulePayload {
    Anglicisms { patterns: Vec<AnglicismPattern> },
    EmojiRange { min: u32, max: u32 },
    Competitors { names: Vec<String> },
    Superlatives { words: Vec<String> },
    BrandMention { names: Vec<String> },
    CtaPhrases { phrases: Vec<String> },
    HashtagCount { min: u32, max: u32 },
    LengthLimits {
        caption_max: u32,
        #[serde(default)]
        title_max: Option<u32>,
    },
    Guidelines { notes: Vec<String> },
}

impl RulePayload {
    pub const KEYS: [&'static str; 9] = [
        "anglicisms",
        "emoji_range",
        "competitors",
        "superlatives",
        "brand_mention",
        "cta_phrases",
        "hashtag_count",
        "length_limits",
        "guidelines",
    ];

    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            RulePayload::Anglicisms { .. } => "anglicisms",
            RulePayload::EmojiRange { .. } => "emoji_range",
            RulePayload::Competitors { .. } => "competitors",
            RulePayload::Superlatives { .. } => "superlatives",
            RulePayload::BrandMention { .. } => "brand_mention",
            RulePayload::CtaPhrases { .. } => "cta_phrases",
            RulePayload::HashtagCount { .. } => "hashtag_count",
            RulePayload::LengthLimits { .. } => "length_limits",
            RulePayload::Guidelines { .. } => "guidelines",
        }
    }

    /// Type and validate a raw JSON payload stored under `rule_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] for unknown keys, payloads that do not match the
    /// key's shape, or payloads that fail [`RulePayload::validate`].
    pub fn from_json(rule_key: &str, payload: serde_json::Value) -> Result<Self, RuleError> {
        if !Self::KEYS.contains(&rule_key) {
            return Err(RuleError::UnknownKey(rule_key.to_string()));
        }
        let tagged = serde_json::json!({ "rule_key": rule_key, "payload": payload });
        let parsed: RulePayload =
            serde_json::from_value(tagged).map_err(|e| RuleError::InvalidPayload {
                rule_key: rule_key.to_string(),
                reason: e.to_string(),
            })?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// The untagged payload, as stored in the `payload` column.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => map
                .remove("payload")
                .unwrap_or(serde_json::Value::Null),
            _ => serde_json::Value::Null,
        }
    }

    /// # Errors
    ///
    /// Returns [`RuleError`] for inverted ranges, empty lists, blank entries
    /// and patterns that do not compile.
    pub fn validate(&self) -> Result<(), RuleError> {
        let key = self.key();
        match self {
            RulePayload::Anglicisms { patterns } => {
                if patterns.is_empty() {
                    return Err(RuleError::EmptyList {
                        rule_key: key,
                        field: "patterns",
                    });
                }
                for p in patterns {
                    if p.pattern.trim().is_empty() {
                        return Err(RuleError::InvalidPayload {
                            rule_key: key.to_string(),
                            reason: "pattern must be non-empty".to_string(),
                        });
                    }
                    p.regex()?;
                }
                Ok(())
            }
            RulePayload::EmojiRange { min, max } | RulePayload::HashtagCount { min, max } => {
                if min > max {
                    Err(RuleError::InvalidRange {
                        rule_key: key,
                        min: *min,
                        max: *max,
                    })
                } else {
                    Ok(())
                }
            }
            RulePayload::Competitors { names } | RulePayload::BrandMention { names } => {
                non_empty_list(key, "names", names)
            }
            RulePayload::Superlatives { words } => non_empty_list(key, "words", words),
            RulePayload::CtaPhrases { phrases } => non_empty_list(key, "phrases", phrases),
            RulePayload::Guidelines { notes } => non_empty_list(key, "notes", notes),
            RulePayload::LengthLimits {
                caption_max,
                title_max,
            } => {
                if *caption_max == 0 || *title_max == Some(0) {
                    Err(RuleError::InvalidPayload {
                        rule_key: key.to_string(),
                        reason: "limits must be greater than zero".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn non_empty_list(
    rule_key: &'static str,
    field: &'static str,
    items: &[String],
) -> Result<(), RuleError> {
    if items.is_empty() {
        return Err(RuleError::EmptyList { rule_key, field });
    }
    if items.iter().any(|s| s.trim().is_empty()) {
        return Err(RuleError::InvalidPayload {
            rule_key: rule_key.to_string(),
            reason: format!("'{field}' contains a blank entry"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandRule {
    /// Store id; `None` for rules read straight from YAML.
    pub id: Option<i64>,
    pub rule_type: RuleType,
    pub scope: RuleScope,
    pub severity: Severity,
    pub version: i32,
    pub is_active: bool,
    #[serde(flatten)]
    pub payload: RulePayload,
}

impl BrandRule {
    #[must_use]
    pub fn rule_key(&self) -> &'static str {
        self.payload.key()
    }

    /// Active and either global or scoped to `channel`.
    #[must_use]
    pub fn applies_to(&self, channel: Channel) -> bool {
        self.is_active
            && match self.scope {
                RuleScope::All => true,
                RuleScope::Channel(c) => c == channel,
            }
    }
}

/// One entry of the rules YAML file, before its payload is typed.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub rule_type: RuleType,
    #[serde(default = "default_scope")]
    pub scope: RuleScope,
    pub rule_key: String,
    pub severity: Severity,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub payload: serde_json::Value,
}

fn default_scope() -> RuleScope {
    RuleScope::All
}

fn default_version() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

impl TryFrom<RuleEntry> for BrandRule {
    type Error = RuleError;

    fn try_from(entry: RuleEntry) -> Result<Self, Self::Error> {
        let payload = RulePayload::from_json(&entry.rule_key, entry.payload)?;
        Ok(BrandRule {
            id: None,
            rule_type: entry.rule_type,
            scope: entry.scope,
            severity: entry.severity,
            version: entry.version,
            is_active: entry.is_active,
            payload,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RulesFile {
    pub rules: Vec<RuleEntry>,
}

/// Load and validate a rule set from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed, if a payload
/// is invalid, or if a `(rule_key, scope)` pair appears twice.
pub fn load_rules(path: &Path) -> Result<Vec<BrandRule>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_rules(&content)
}

/// Parse and validate a rule set from YAML text.
///
/// # Errors
///
/// See [`load_rules`].
pub fn parse_rules(yaml: &str) -> Result<Vec<BrandRule>, ConfigError> {
    let file: RulesFile = serde_yaml::from_str(yaml)?;
    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(file.rules.len());
    for entry in file.rules {
        if !seen.insert((entry.rule_key.clone(), entry.scope)) {
            return Err(RuleError::Duplicate {
                rule_key: entry.rule_key,
                scope: entry.scope,
            }
            .into());
        }
        rules.push(BrandRule::try_from(entry)?);
    }
    Ok(rules)
}
