use serde::{Deserialize, Serialize};
use std::fmt;

/// Postal location of the property, as extracted from the application letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub town: Option<String>,
    pub postal_code: Option<String>,
    pub complete_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescription {
    pub accommodation_type: Option<String>,
    /// Usable floor area in square metres, parsed from `"<n>m2"`.
    pub surface_area: u32,
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Application details produced by the information-extraction stage.
///
/// The pipeline owns one instance per request. Later stages only read it;
/// their own outputs live in [`SolvencyResult`] and [`PropertyEvaluationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplicationContext {
    pub customer_id: String,
    pub name: String,
    pub declared_property_price: f64,
    pub property_description: PropertyDescription,
    pub contact: Option<Contact>,
    pub loan_amount: Option<f64>,
    pub monthly_income: Option<f64>,
    pub monthly_expenses: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolvencyResult {
    /// In `[0, 100]`.
    pub credit_score: f64,
    pub financial_capacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyEvaluationResult {
    pub estimated_value: f64,
    pub has_litigation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub reasons: Vec<String>,
    pub message: String,
}

/// Wire-level request or response wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEnvelope {
    pub operation_name: String,
    pub parameters: Vec<(String, String)>,
    pub raw_body: String,
}

impl RemoteEnvelope {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The three remote stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InformationExtraction,
    Solvency,
    PropertyEvaluation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::InformationExtraction => "information extraction",
            Stage::Solvency => "solvency check",
            Stage::PropertyEvaluation => "property evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a completed run produced, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub request_id: String,
    pub application: LoanApplicationContext,
    pub solvency: SolvencyResult,
    pub property: PropertyEvaluationResult,
    pub verdict: Verdict,
}
