//! Risk analysis guard rail.
//!
//! The guard rail compares the applied rate against a per-pair reference
//! rate and classifies the conversion into one of three reachable
//! outcomes: `NOT_APPROVED`, `WARNING` or `REQUESTED`. `APPROVED` is never
//! produced here; it is reserved for the confirmation step.

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crownfx_common::{round_variation, CurrencyPair, TransactionStatus};

/// Risk score above which a conversion is rejected outright (0.7).
fn reject_threshold() -> Decimal {
    Decimal::new(7, 1)
}

/// Risk score above which a conversion is flagged for approval (0.4).
fn warn_threshold() -> Decimal {
    Decimal::new(4, 1)
}

/// Multiplier above which a fixed risk penalty applies (1.5).
fn multiplier_penalty_threshold() -> Decimal {
    Decimal::new(15, 1)
}

/// The fixed penalty added for high multipliers (0.1).
fn multiplier_penalty() -> Decimal {
    Decimal::new(1, 1)
}

/// Per-pair reference rates used as the baseline for variation.
///
/// Kept separate from the rate repositories so the guard rail never
/// judges a rate against the data under evaluation. Unknown pairs fall
/// back to a neutral reference of 1.
pub struct ReferenceRates {
    rates: DashMap<String, Decimal>,
}

impl ReferenceRates {
    /// Create an empty reference table.
    pub fn new() -> Self {
        Self {
            rates: DashMap::new(),
        }
    }

    /// Create the default table: 1 Ouro Real = 2.5 Tibars.
    pub fn with_defaults() -> Self {
        let table = Self::new();
        table.set(
            CurrencyPair::new("ORO".into(), "TIB".into()),
            Decimal::new(25, 1),
        );
        table.set(
            CurrencyPair::new("TIB".into(), "ORO".into()),
            Decimal::new(4, 1),
        );
        table
    }

    /// Set the reference rate for a pair.
    pub fn set(&self, pair: CurrencyPair, rate: Decimal) {
        self.rates.insert(pair.to_string(), rate);
    }

    /// Get the reference rate for a pair, falling back to 1.
    pub fn get(&self, pair: &CurrencyPair) -> Decimal {
        self.rates
            .get(&pair.to_string())
            .map(|r| *r)
            .unwrap_or(Decimal::ONE)
    }
}

impl Default for ReferenceRates {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Result of one guard-rail evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Classification outcome.
    pub status: TransactionStatus,
    /// Human-readable reason, carrying the percentage variation.
    pub reason: String,
    /// Risk score in [0, 1].
    pub risk_score: Decimal,
    /// Warnings to surface to the caller.
    pub warnings: Vec<String>,
    /// Recommended follow-up actions.
    pub recommendations: Vec<String>,
    /// Whether the conversion may be executed.
    pub can_proceed: bool,
    /// Whether an explicit approval step is still required.
    pub requires_approval: bool,
}

/// The guard rail itself: a flat classifier, not a stepped state machine.
pub struct RiskAnalyzer {
    references: ReferenceRates,
}

impl RiskAnalyzer {
    /// Create an analyzer over the given reference table.
    pub fn new(references: ReferenceRates) -> Self {
        Self { references }
    }

    /// Evaluate an applied rate against the pair's reference rate.
    ///
    /// `multiplier` is the product multiplier that went into the applied
    /// rate; multipliers above 1.5 add a fixed 0.1 penalty to the score.
    /// The score is clamped to [0, 1] after the penalty.
    pub fn assess(
        &self,
        pair: &CurrencyPair,
        applied_rate: Decimal,
        multiplier: Decimal,
    ) -> RiskAssessment {
        let reference = self.references.get(pair);
        let variation = Self::variation(reference, applied_rate);
        let mut risk_score = variation.abs().min(Decimal::ONE);

        if multiplier > multiplier_penalty_threshold() {
            risk_score += multiplier_penalty();
            risk_score = risk_score.min(Decimal::ONE);
        }

        debug!(
            pair = %pair,
            reference = %reference,
            applied = %applied_rate,
            variation = %variation,
            risk_score = %risk_score,
            "Risk assessed"
        );

        if risk_score > reject_threshold() {
            Self::not_approved(variation, multiplier, risk_score)
        } else if risk_score > warn_threshold() {
            Self::warning(variation, multiplier, risk_score)
        } else {
            Self::requested(risk_score)
        }
    }

    /// Raw risk score for a reference/applied rate pair, without
    /// classification. Exposed for callers outside the pipeline.
    pub fn quick_score(reference: Decimal, applied: Decimal) -> Decimal {
        Self::variation(reference, applied).abs().min(Decimal::ONE)
    }

    fn variation(reference: Decimal, applied: Decimal) -> Decimal {
        if reference.is_zero() {
            return Decimal::ZERO;
        }
        round_variation((applied - reference) / reference)
    }

    fn percent(variation: Decimal) -> Decimal {
        (variation * Decimal::from(100)).round_dp(1)
    }

    fn multiplier_note(warnings: &mut Vec<String>, multiplier: Decimal) {
        if multiplier != Decimal::ONE {
            warnings.push(format!("multiplier applied: {}", multiplier));
        }
    }

    fn not_approved(variation: Decimal, multiplier: Decimal, risk_score: Decimal) -> RiskAssessment {
        let mut warnings = vec!["anomalous unfavorable rate".to_string()];
        Self::multiplier_note(&mut warnings, multiplier);

        RiskAssessment {
            status: TransactionStatus::NotApproved,
            reason: format!(
                "rate highly unfavorable ({}% variation)",
                Self::percent(variation)
            ),
            risk_score,
            warnings,
            recommendations: vec!["wait for a more favorable rate".to_string()],
            can_proceed: false,
            requires_approval: false,
        }
    }

    fn warning(variation: Decimal, multiplier: Decimal, risk_score: Decimal) -> RiskAssessment {
        let mut warnings = vec!["rate above the normal range".to_string()];
        Self::multiplier_note(&mut warnings, multiplier);

        RiskAssessment {
            status: TransactionStatus::Warning,
            reason: format!(
                "rate outside the normal range ({}% variation)",
                Self::percent(variation)
            ),
            risk_score,
            warnings,
            recommendations: vec!["confirm the amount is correct".to_string()],
            can_proceed: true,
            requires_approval: true,
        }
    }

    fn requested(risk_score: Decimal) -> RiskAssessment {
        RiskAssessment {
            status: TransactionStatus::Requested,
            reason: "conversion accepted, awaiting confirmation".to_string(),
            risk_score,
            warnings: Vec::new(),
            recommendations: vec![
                "confirm the transaction to finalize it".to_string(),
                "the transaction expires in 30 minutes".to_string(),
            ],
            can_proceed: true,
            requires_approval: true,
        }
    }
}

impl Default for RiskAnalyzer {
    fn default() -> Self {
        Self::new(ReferenceRates::with_defaults())
    }
}
