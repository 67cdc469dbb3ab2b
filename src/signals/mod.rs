use crate::core::{Alert, RiskSignals, Severity};

/// Every wallet starts here; conditions only ever add.
const BASE_SCORE: f64 = 3.0;

/// More than this many unverified-contract interactions flags a wallet as a
/// likely victim.
const UNVERIFIED_THRESHOLD: usize = 5;

/// Scorer output: a score, condition labels plus exactly one risk tier, and
/// an ordered alert list.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub labels: Vec<String>,
    pub alerts: Vec<Alert>,
}

/// Map derived signals to a score, labels and alerts.
///
/// Pure and deterministic: identical signals always produce an identical
/// assessment. Additive thresholds over a base of 3.0; thresholds and deltas
/// are fixed policy, not configuration.
pub fn assess(signals: &RiskSignals) -> RiskAssessment {
    let mut score = BASE_SCORE;
    let mut labels = Vec::new();
    let mut alerts = Vec::new();

    if signals.failed_tx_count > 0 {
        score += 1.5;
        alerts.push(Alert {
            alert_type: "Failed Tx".into(),
            severity: Severity::Medium,
            description: format!(
                "{} failed transaction(s) detected",
                signals.failed_tx_count
            ),
        });
    }

    if signals.blacklist_hit_count > 0 {
        score += 3.0;
        alerts.push(Alert {
            alert_type: "Blacklist Hit".into(),
            severity: Severity::High,
            description: format!(
                "{} transaction(s) targeted a blacklisted address",
                signals.blacklist_hit_count
            ),
        });
        labels.push("Interacted With Malicious Contract".into());
    }

    if signals.unverified_interaction_count > UNVERIFIED_THRESHOLD {
        score += 1.5;
        alerts.push(Alert {
            alert_type: "Unverified Contracts".into(),
            severity: Severity::Medium,
            description: format!(
                "{} interaction(s) with unverified contracts",
                signals.unverified_interaction_count
            ),
        });
        labels.push("Likely Victim Wallet".into());
    }

    labels.push(tier_label(score).to_string());

    RiskAssessment {
        score,
        labels,
        alerts,
    }
}

/// Exactly one of these three is always present on a report.
fn tier_label(score: f64) -> &'static str {
    if score > 8.0 {
        "High Risk Wallet"
    } else if score > 5.0 {
        "Moderate Risk"
    } else {
        "Low Risk"
    }
}

/// Templated one-sentence summary. Deterministic for the same inputs; the
/// "ai" in the report field name is a front-end label, not a generative step.
pub fn summary_sentence(score: f64, signals: &RiskSignals) -> String {
    if score > 6.0 {
        format!(
            "This wallet shows elevated risk: {} failed transaction(s), \
             {} blacklisted counterparty hit(s) and {} unverified contract \
             interaction(s). Review its outstanding approvals and revoke any \
             that are not needed.",
            signals.failed_tx_count,
            signals.blacklist_hit_count,
            signals.unverified_interaction_count
        )
    } else {
        "This wallet appears clean. No significant risk patterns were found \
         in its recent on-chain history."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(failed: usize, blacklisted: usize, unverified: usize) -> RiskSignals {
        RiskSignals {
            failed_tx_count: failed,
            blacklist_hit_count: blacklisted,
            unverified_interaction_count: unverified,
            outstanding_approval_count: 0,
        }
    }

    #[test]
    fn clean_wallet_scores_base() {
        let a = assess(&signals(0, 0, 0));
        assert_eq!(a.score, 3.0);
        assert_eq!(a.labels, vec!["Low Risk".to_string()]);
        assert!(a.alerts.is_empty());
    }

    #[test]
    fn one_failed_tx_is_still_low_risk() {
        let a = assess(&signals(1, 0, 0));
        assert_eq!(a.score, 4.5);
        assert_eq!(a.labels, vec!["Low Risk".to_string()]);
        assert_eq!(a.alerts.len(), 1);
        assert_eq!(a.alerts[0].alert_type, "Failed Tx");
        assert_eq!(a.alerts[0].severity, Severity::Medium);
    }

    #[test]
    fn blacklist_and_unverified_make_moderate_risk() {
        // 3.0 + 3.0 + 1.5 = 7.5
        let a = assess(&signals(0, 1, 6));
        assert_eq!(a.score, 7.5);
        assert_eq!(
            a.labels,
            vec![
                "Interacted With Malicious Contract".to_string(),
                "Likely Victim Wallet".to_string(),
                "Moderate Risk".to_string(),
            ]
        );
        let types: Vec<&str> = a.alerts.iter().map(|al| al.alert_type.as_str()).collect();
        assert_eq!(types, vec!["Blacklist Hit", "Unverified Contracts"]);
    }

    #[test]
    fn all_conditions_make_high_risk() {
        // 3.0 + 1.5 + 3.0 + 1.5 = 9.0
        let a = assess(&signals(2, 1, 7));
        assert_eq!(a.score, 9.0);
        assert!(a.labels.contains(&"High Risk Wallet".to_string()));
        assert_eq!(a.alerts.len(), 3);
    }

    #[test]
    fn unverified_threshold_is_strict() {
        // exactly 5 does not trigger
        let a = assess(&signals(0, 0, 5));
        assert_eq!(a.score, 3.0);
        assert!(a.alerts.is_empty());

        let a = assess(&signals(0, 0, 6));
        assert_eq!(a.score, 4.5);
        assert_eq!(a.alerts[0].alert_type, "Unverified Contracts");
    }

    #[test]
    fn assessment_is_idempotent() {
        let s = signals(3, 2, 9);
        assert_eq!(assess(&s), assess(&s));
    }

    #[test]
    fn summary_is_deterministic_and_threshold_gated() {
        let risky = signals(1, 1, 6);
        let text = summary_sentence(9.0, &risky);
        assert!(text.contains("elevated risk"));
        assert_eq!(text, summary_sentence(9.0, &risky));

        let clean = summary_sentence(3.0, &signals(0, 0, 0));
        assert!(clean.contains("appears clean"));
        // boundary: 6.0 is not "risk-aware"
        assert!(summary_sentence(6.0, &signals(0, 0, 0)).contains("appears clean"));
    }
}
