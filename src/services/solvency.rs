use crate::core::decoders::{render_mapping_literal, Literal};
use crate::domain::model::SolvencyResult;
use crate::services::reference::{CreditRecord, ReferenceData};

/// Credit score in `[0, 100]` from a customer's credit history.
pub fn credit_score(record: &CreditRecord) -> u8 {
    if *record == CreditRecord::CLEAN {
        return 100;
    }
    if record.late_payments >= 2 && record.has_bankruptcy {
        return 0;
    }
    if record.late_payments < 2 && record.outstanding_debt < 1000.0 {
        return 80;
    }
    if record.late_payments < 2 && record.outstanding_debt > 1000.0 {
        return 60;
    }
    50
}

pub fn assess(reference: &ReferenceData, customer_id: &str) -> SolvencyResult {
    let record = reference.credit_record(customer_id);
    let (income, expense) = reference.financials(customer_id);

    let result = SolvencyResult {
        credit_score: f64::from(credit_score(&record)),
        financial_capacity: income - expense,
    };

    match reference.customer_details(customer_id).and_then(|d| d.name.as_deref()) {
        Some(name) => tracing::info!("💳 Solvency for {} ({}): {:?}", customer_id, name, result),
        None => tracing::info!("💳 Solvency for unknown customer {}: {:?}", customer_id, result),
    }
    result
}

pub fn to_mapping_literal(result: &SolvencyResult) -> String {
    render_mapping_literal(&[
        ("financial_cap", Literal::Number(result.financial_capacity)),
        ("score", Literal::Number(result.credit_score)),
    ])
}
