//! Brand-voice checks over a variant's title and caption.

use regex::{Regex, RegexBuilder};
use socops_core::{BrandFinding, BrandResult, BrandRule, GateLevel, RulePayload, Severity};

pub(crate) fn check(text: &str, rules: &[&BrandRule]) -> BrandResult {
    let mut findings = Vec::new();
    for rule in rules {
        match &rule.payload {
            RulePayload::Anglicisms { patterns } => {
                for p in patterns {
                    let Ok(re) = p.regex() else {
                        tracing::warn!(rule_key = "anglicisms", pattern = %p.pattern, "skipping invalid pattern");
                        continue;
                    };
                    if let Some(m) = re.find(text) {
                        findings.push(BrandFinding {
                            rule_key: rule.rule_key().to_string(),
                            severity: rule.severity,
                            message: format!("anglicisme « {} »", m.as_str()),
                            suggestion: p
                                .replacement
                                .as_ref()
                                .map(|r| format!("remplacer « {} » par « {r} »", m.as_str())),
                        });
                    }
                }
            }
            RulePayload::EmojiRange { min, max } => {
                let count = count_emojis(text);
                if count < *min || count > *max {
                    findings.push(BrandFinding {
                        rule_key: rule.rule_key().to_string(),
                        severity: rule.severity,
                        message: format!("{count} emoji(s), attendu entre {min} et {max}"),
                        suggestion: Some(if count < *min {
                            "ajouter quelques emojis".to_string()
                        } else {
                            "réduire le nombre d'emojis".to_string()
                        }),
                    });
                }
            }
            RulePayload::Competitors { names } => {
                for name in names.iter().filter(|n| contains_term(text, n)) {
                    findings.push(BrandFinding {
                        rule_key: rule.rule_key().to_string(),
                        severity: Severity::Block,
                        message: format!("mention d'un concurrent : {name}"),
                        suggestion: Some(format!("retirer la mention de {name}")),
                    });
                }
            }
            RulePayload::Superlatives { words } => {
                for word in words.iter().filter(|w| contains_term(text, w)) {
                    findings.push(BrandFinding {
                        rule_key: rule.rule_key().to_string(),
                        severity: rule.severity,
                        message: format!("superlatif non justifié : {word}"),
                        suggestion: Some("nuancer ou sourcer l'affirmation".to_string()),
                    });
                }
            }
            RulePayload::BrandMention { names } => {
                if !names.iter().any(|n| contains_term(text, n)) {
                    findings.push(BrandFinding {
                        rule_key: rule.rule_key().to_string(),
                        severity: Severity::Warn,
                        message: "la marque n'est pas mentionnée".to_string(),
                        suggestion: names.first().map(|n| format!("mentionner {n}")),
                    });
                }
            }
            RulePayload::CtaPhrases { .. }
            | RulePayload::HashtagCount { .. }
            | RulePayload::LengthLimits { .. }
            | RulePayload::Guidelines { .. } => {}
        }
    }

    let level = if findings.iter().any(|f| f.severity == Severity::Block) {
        GateLevel::Fail
    } else if findings.is_empty() {
        GateLevel::Pass
    } else {
        GateLevel::Warn
    };

    let mut suggestions: Vec<String> = Vec::new();
    for s in findings.iter().filter_map(|f| f.suggestion.clone()) {
        if !suggestions.contains(&s) {
            suggestions.push(s);
        }
    }

    let (violations, warnings) = findings
        .into_iter()
        .partition(|f| f.severity == Severity::Block);

    BrandResult {
        violations,
        warnings,
        suggestions,
        level,
    }
}

/// Case-insensitive whole-word match.
pub(crate) fn contains_term(text: &str, term: &str) -> bool {
    term_regex(term).is_some_and(|re| re.is_match(text))
}

fn term_regex(term: &str) -> Option<Regex> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"(?:^|\W){}(?:$|\W)", regex::escape(term)))
        .case_insensitive(true)
        .build()
        .ok()
}

pub(crate) fn count_emojis(text: &str) -> u32 {
    let count = text.chars().filter(|c| is_emoji(*c)).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B00..=0x2BFF | 0x2300..=0x23FF
    )
}
