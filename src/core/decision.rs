use crate::domain::model::{PropertyEvaluationResult, SolvencyResult, Verdict};
use std::fmt;

const MIN_CREDIT_SCORE_EXCLUSIVE: f64 = 50.0;

/// Failing approval criteria, declared in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RejectionReason {
    ValueAbovePrice,
    Litigation,
    InsufficientCreditScore,
    LimitedFinancialCapacity,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::ValueAbovePrice => "Estimated value exceeds the purchase price",
            RejectionReason::Litigation => "Potential litigation on the property",
            RejectionReason::InsufficientCreditScore => "Insufficient credit score",
            RejectionReason::LimitedFinancialCapacity => "Limited financial capacity",
        };
        f.write_str(text)
    }
}

pub fn rejection_reasons(
    estimated_value: f64,
    declared_price: f64,
    has_litigation: bool,
    credit_score: f64,
    financial_capacity: f64,
) -> Vec<RejectionReason> {
    let mut reasons = Vec::new();
    if estimated_value > declared_price {
        reasons.push(RejectionReason::ValueAbovePrice);
    }
    if has_litigation {
        reasons.push(RejectionReason::Litigation);
    }
    if credit_score <= MIN_CREDIT_SCORE_EXCLUSIVE {
        reasons.push(RejectionReason::InsufficientCreditScore);
    }
    if financial_capacity <= 0.0 {
        reasons.push(RejectionReason::LimitedFinancialCapacity);
    }
    reasons
}

/// Approves only when every criterion holds; otherwise lists each failing one.
pub fn decide(
    estimated_value: f64,
    declared_price: f64,
    has_litigation: bool,
    credit_score: f64,
    financial_capacity: f64,
    name: &str,
) -> Verdict {
    let reasons = rejection_reasons(
        estimated_value,
        declared_price,
        has_litigation,
        credit_score,
        financial_capacity,
    );

    if reasons.is_empty() {
        Verdict {
            approved: true,
            reasons: Vec::new(),
            message: approval_message(name),
        }
    } else {
        Verdict {
            approved: false,
            message: rejection_message(name, &reasons),
            reasons: reasons.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn decide_from_results(
    declared_price: f64,
    name: &str,
    solvency: &SolvencyResult,
    property: &PropertyEvaluationResult,
) -> Verdict {
    decide(
        property.estimated_value,
        declared_price,
        property.has_litigation,
        solvency.credit_score,
        solvency.financial_capacity,
        name,
    )
}

fn approval_message(name: &str) -> String {
    format!(
        "Dear {name},

Your mortgage application has been APPROVED.

Key points:
• Adequate property value
• No litigation
• Satisfactory credit score
• Sufficient financial capacity

Next steps:
1. Visit our branch to finalise your file
2. Bring: identity document, proof of income, tax notice, sales agreement

Our advisor is at your disposal for any question.

Kind regards,
The mortgage team"
    )
}

fn rejection_message(name: &str, reasons: &[RejectionReason]) -> String {
    let bullets = reasons
        .iter()
        .map(|reason| format!("• {}", reason))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Dear {name},

We regret to inform you that your mortgage application has not been approved.

Main reasons:
{bullets}

Recommendations for the next 6 months:
1. Improve your credit score
2. Increase your savings
3. Stabilise your professional situation
4. Reassess the targeted property

Contact us for a personalised advice appointment.

Kind regards,
The mortgage team"
    )
}
