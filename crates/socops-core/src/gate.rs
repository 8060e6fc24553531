//! Gate verdict types. The evaluation itself lives in `socops-pipeline`.

use serde::{Deserialize, Serialize};

use crate::rules::Severity;

/// Ordered so that `max()` yields the worst level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateLevel {
    Pass,
    Warn,
    Fail,
}

impl GateLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GateLevel::Pass => "PASS",
            GateLevel::Warn => "WARN",
            GateLevel::Fail => "FAIL",
        }
    }

    /// Per-axis score: PASS = 100, WARN = 70, FAIL = 0.
    #[must_use]
    pub fn score(self) -> u8 {
        match self {
            GateLevel::Pass => 100,
            GateLevel::Warn => 70,
            GateLevel::Fail => 0,
        }
    }
}

impl std::fmt::Display for GateLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GateLevel {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(GateLevel::Pass),
            "WARN" => Ok(GateLevel::Warn),
            "FAIL" => Ok(GateLevel::Fail),
            _ => Err(crate::CoreError::UnknownVariant {
                kind: "gate level",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandFinding {
    pub rule_key: String,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandResult {
    /// Findings with `block` severity.
    pub violations: Vec<BrandFinding>,
    /// Findings with `warn` or `info` severity.
    pub warnings: Vec<BrandFinding>,
    pub suggestions: Vec<String>,
    pub level: GateLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub name: String,
    pub level: GateLevel,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub checks: Vec<ComplianceCheck>,
    pub level: GateLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSummary {
    pub brand: BrandResult,
    pub compliance: ComplianceResult,
    pub can_approve: bool,
    pub blocking_issues: Vec<String>,
}

impl GateSummary {
    /// Mean of the two axis scores.
    #[must_use]
    pub fn quality_score(&self) -> u8 {
        let total = u16::from(self.brand.level.score()) + u16::from(self.compliance.level.score());
        u8::try_from(total / 2).unwrap_or(u8::MAX)
    }
}
