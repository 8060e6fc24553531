//! Legal and platform compliance checks on the primary-channel variant.

use std::collections::BTreeSet;

use super::brand::contains_term;
use socops_core::{
    BrandRule, Channel, ChannelVariant, ComplianceCheck, ComplianceResult, GateLevel,
    RulePayload, RuleScope, UtmParams,
};

/// Used when no `cta_phrases` rule is configured. Covers every
/// [`socops_core::CtaType`] wording.
const DEFAULT_CTA_PHRASES: [&str; 10] = [
    "découvrez",
    "commandez",
    "achetez",
    "profitez",
    "en savoir plus",
    "lien en bio",
    "cliquez",
    "rendez-vous sur",
    "lisez notre guide",
    "contactez",
];

pub(crate) fn check(
    channel: Channel,
    variant: Option<&ChannelVariant>,
    utm: Option<&UtmParams>,
    rules: &[&BrandRule],
) -> ComplianceResult {
    let checks = vec![
        utm_params(utm),
        caption_present(variant),
        call_to_action(variant, rules),
        hashtag_count(variant, rules),
        caption_length(channel, variant, rules),
        title_length(channel, variant, rules),
    ];
    let level = checks
        .iter()
        .map(|c| c.level)
        .max()
        .unwrap_or(GateLevel::Pass);
    ComplianceResult { checks, level }
}

fn outcome(name: &str, level: GateLevel, detail: String) -> ComplianceCheck {
    ComplianceCheck {
        name: name.to_string(),
        level,
        detail,
    }
}

fn utm_params(utm: Option<&UtmParams>) -> ComplianceCheck {
    match utm {
        Some(params) if params.is_attributable() => outcome(
            "utm_params",
            GateLevel::Pass,
            format!("utm_campaign={}", params.campaign),
        ),
        Some(params) => {
            let missing: Vec<&str> = [
                ("utm_campaign", &params.campaign),
                ("utm_source", &params.source),
                ("utm_medium", &params.medium),
            ]
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect();
            outcome(
                "utm_params",
                GateLevel::Fail,
                format!("paramètres UTM manquants : {}", missing.join(", ")),
            )
        }
        None => outcome(
            "utm_params",
            GateLevel::Fail,
            "aucun paramètre UTM".to_string(),
        ),
    }
}

fn caption_present(variant: Option<&ChannelVariant>) -> ComplianceCheck {
    match variant {
        Some(v) if !v.caption.trim().is_empty() => {
            outcome("caption_present", GateLevel::Pass, "légende présente".to_string())
        }
        Some(_) => outcome("caption_present", GateLevel::Fail, "légende vide".to_string()),
        None => outcome(
            "caption_present",
            GateLevel::Fail,
            "aucun contenu pour le canal principal".to_string(),
        ),
    }
}

fn call_to_action(variant: Option<&ChannelVariant>, rules: &[&BrandRule]) -> ComplianceCheck {
    let configured: Vec<&str> = rules
        .iter()
        .filter_map(|r| match &r.payload {
            RulePayload::CtaPhrases { phrases } => Some(phrases.iter().map(String::as_str)),
            _ => None,
        })
        .flatten()
        .collect();
    let phrases: Vec<&str> = if configured.is_empty() {
        DEFAULT_CTA_PHRASES.to_vec()
    } else {
        configured
    };

    // Only the caption is published; `call_to_action` never reaches a manifest.
    let caption = variant.map_or("", |v| v.caption.as_str());

    match phrases.iter().find(|p| contains_term(caption, p)) {
        Some(found) => outcome(
            "call_to_action",
            GateLevel::Pass,
            format!("appel à l'action « {found} »"),
        ),
        None => outcome(
            "call_to_action",
            GateLevel::Warn,
            "aucun appel à l'action reconnu".to_string(),
        ),
    }
}

/// Distinct tags from the hashtag list and from `#tags` written inline in the
/// caption, compared case-insensitively.
pub(crate) fn distinct_hashtags(variant: &ChannelVariant) -> BTreeSet<String> {
    let inline = variant
        .caption
        .split_whitespace()
        .filter(|w| w.starts_with('#'))
        .map(|w| w.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_'));
    variant
        .hashtags
        .iter()
        .map(String::as_str)
        .chain(inline)
        .map(|t| t.trim_start_matches('#').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn hashtag_count(variant: Option<&ChannelVariant>, rules: &[&BrandRule]) -> ComplianceCheck {
    let count = variant.map_or(0, |v| distinct_hashtags(v).len());
    let range = most_specific(rules, |p| match p {
        RulePayload::HashtagCount { min, max } => Some((*min, *max)),
        _ => None,
    });

    let Some((min, max)) = range else {
        return outcome(
            "hashtag_count",
            GateLevel::Pass,
            format!("{count} hashtag(s), aucune fourchette configurée"),
        );
    };
    let count_u32 = u32::try_from(count).unwrap_or(u32::MAX);
    let detail = format!("{count} hashtag(s), attendu entre {min} et {max}");
    if count == 0 && min > 0 {
        outcome("hashtag_count", GateLevel::Fail, detail)
    } else if count_u32 < min || count_u32 > max {
        outcome("hashtag_count", GateLevel::Warn, detail)
    } else {
        outcome("hashtag_count", GateLevel::Pass, detail)
    }
}

fn caption_length(
    channel: Channel,
    variant: Option<&ChannelVariant>,
    rules: &[&BrandRule],
) -> ComplianceCheck {
    let limit = most_specific(rules, |p| match p {
        RulePayload::LengthLimits { caption_max, .. } => usize::try_from(*caption_max).ok(),
        _ => None,
    })
    .unwrap_or_else(|| channel.default_caption_limit());
    let len = variant.map_or(0, |v| v.caption.chars().count());
    let detail = format!("{len}/{limit} caractères");
    if len > limit {
        outcome("caption_length", GateLevel::Fail, detail)
    } else {
        outcome("caption_length", GateLevel::Pass, detail)
    }
}

fn title_length(
    channel: Channel,
    variant: Option<&ChannelVariant>,
    rules: &[&BrandRule],
) -> ComplianceCheck {
    let limit = most_specific(rules, |p| match p {
        RulePayload::LengthLimits {
            title_max: Some(max),
            ..
        } => usize::try_from(*max).ok(),
        _ => None,
    })
    .or_else(|| channel.default_title_limit());
    let title = variant.and_then(|v| v.title.as_deref());

    match (title, limit) {
        (Some(title), Some(limit)) => {
            let len = title.chars().count();
            let detail = format!("{len}/{limit} caractères");
            if len > limit {
                outcome("title_length", GateLevel::Fail, detail)
            } else {
                outcome("title_length", GateLevel::Pass, detail)
            }
        }
        (Some(_), None) => outcome(
            "title_length",
            GateLevel::Pass,
            "pas de limite de titre".to_string(),
        ),
        (None, _) => outcome("title_length", GateLevel::Pass, "pas de titre".to_string()),
    }
}

/// First match among channel-scoped rules, then among global ones.
fn most_specific<T>(rules: &[&BrandRule], pick: impl Fn(&RulePayload) -> Option<T>) -> Option<T> {
    let scoped = rules
        .iter()
        .filter(|r| matches!(r.scope, RuleScope::Channel(_)))
        .find_map(|r| pick(&r.payload));
    scoped.or_else(|| {
        rules
            .iter()
            .filter(|r| r.scope == RuleScope::All)
            .find_map(|r| pick(&r.payload))
    })
}
