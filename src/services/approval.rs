//! Standalone approval-decision calculator (policy gate, risk score, loan terms).
//!
//! The formulas are kept exactly as the business defined them.

use crate::utils::error::{LoanError, Result};
use serde::Serialize;

pub const MIN_CREDIT_SCORE: f64 = 650.0;
pub const MAX_DEBT_TO_INCOME_RATIO: f64 = 0.43;
pub const MIN_PROPERTY_VALUE_TO_LOAN_RATIO: f64 = 1.2;
pub const MAX_RISK_SCORE: f64 = 75.0;
pub const MAX_DEFAULT_PROBABILITY: f64 = 0.35;
pub const BASE_RATE: f64 = 0.03;
pub const TERM_YEARS: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub client_name: String,
    pub credit_score: f64,
    pub debt_to_income_ratio: f64,
    pub property_value: f64,
    pub loan_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanTerms {
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub term_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalDecision {
    pub client_name: String,
    pub approved: bool,
    pub reason: String,
    pub risk_score: f64,
    pub default_probability: f64,
    pub loan_terms: Option<LoanTerms>,
}

pub fn meets_basic_requirements(
    credit_score: f64,
    debt_to_income_ratio: f64,
    property_value: f64,
    loan_amount: f64,
) -> bool {
    credit_score >= MIN_CREDIT_SCORE
        && debt_to_income_ratio <= MAX_DEBT_TO_INCOME_RATIO
        && property_value >= loan_amount * MIN_PROPERTY_VALUE_TO_LOAN_RATIO
}

pub fn risk_score(
    credit_score: f64,
    debt_to_income_ratio: f64,
    property_value: f64,
    loan_amount: f64,
) -> f64 {
    let mut score = 100.0 - credit_score / 8.5;
    score += debt_to_income_ratio * 100.0;
    score += loan_amount / property_value * 60.0;
    score.clamp(0.0, 100.0)
}

pub fn default_probability(credit_score: f64, debt_to_income_ratio: f64) -> f64 {
    (((850.0 - credit_score) / 850.0 + debt_to_income_ratio) / 2.0).clamp(0.0, 1.0)
}

pub fn decide_approval(risk_score: f64, meets_policies: bool, default_probability: f64) -> (bool, &'static str) {
    if !meets_policies {
        return (false, "Basic credit criteria are not met");
    }
    if risk_score > MAX_RISK_SCORE {
        return (false, "Assessed risk level is too high");
    }
    if default_probability > MAX_DEFAULT_PROBABILITY {
        return (false, "High probability of default");
    }
    (true, "Application approved")
}

pub fn loan_terms(loan_amount: f64, credit_score: f64) -> LoanTerms {
    let interest_rate = BASE_RATE + (750.0 - credit_score) / 1100.0;
    LoanTerms {
        loan_amount,
        interest_rate: (interest_rate * 10_000.0).round() / 10_000.0,
        term_years: TERM_YEARS,
    }
}

pub fn make_decision(request: &ApprovalRequest) -> Result<ApprovalDecision> {
    if request.property_value <= 0.0 {
        return Err(LoanError::format_error(
            "property_value",
            request.property_value.to_string(),
            "property value must be positive",
        ));
    }

    let meets_policies = meets_basic_requirements(
        request.credit_score,
        request.debt_to_income_ratio,
        request.property_value,
        request.loan_amount,
    );
    let risk = risk_score(
        request.credit_score,
        request.debt_to_income_ratio,
        request.property_value,
        request.loan_amount,
    );
    let probability = default_probability(request.credit_score, request.debt_to_income_ratio);
    let (approved, reason) = decide_approval(risk, meets_policies, probability);

    Ok(ApprovalDecision {
        client_name: request.client_name.clone(),
        approved,
        reason: reason.to_string(),
        risk_score: risk,
        default_probability: probability,
        loan_terms: approved.then(|| loan_terms(request.loan_amount, request.credit_score)),
    })
}
