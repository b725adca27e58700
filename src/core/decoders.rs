//! Structured decoding of the three stage payloads.
//!
//! The extraction stage answers with a JSON object. The solvency and property
//! stages answer with a flat mapping literal such as
//! `{'financial_cap': 500, 'score': 60}`, which is read by a dedicated
//! grammar: quoted string keys, numeric and boolean values, nothing else.

use crate::domain::model::{
    Address, Contact, LoanApplicationContext, PropertyDescription, PropertyEvaluationResult,
    SolvencyResult,
};
use crate::utils::error::{LoanError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub fn decode_information_extraction(text: &str) -> Result<LoanApplicationContext> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| LoanError::format_error("payload", preview(text), e.to_string()))?;
    let root = value
        .as_object()
        .ok_or_else(|| LoanError::format_error("payload", preview(text), "expected a JSON object"))?;

    let customer_id = required_string(root, "customerId", "customerId")?;
    let name = required_string(root, "name", "name")?;
    let declared_property_price = required_number(root, "propertyPrice", "propertyPrice")?;

    let description = required_object(root, "description", "description")?;
    let address = required_object(description, "address", "description.address")?;

    let complete_address = ["completeAdress", "completeAddress"]
        .iter()
        .find_map(|key| match address.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
        .ok_or_else(|| LoanError::field_missing("description.address.completeAddress"))?;

    let surface_raw = description
        .get("surfaceArea")
        .or_else(|| address.get("surfaceArea"))
        .ok_or_else(|| LoanError::field_missing("description.surfaceArea"))?;
    let surface_area = parse_surface_area(surface_raw)?;

    Ok(LoanApplicationContext {
        customer_id,
        name,
        declared_property_price,
        property_description: PropertyDescription {
            accommodation_type: optional_string(description, "accommodationType"),
            surface_area,
            address: Address {
                town: optional_string(address, "town"),
                postal_code: optional_string(address, "postalCode"),
                complete_address,
            },
        },
        contact: root.get("contact").and_then(Value::as_object).map(|c| Contact {
            phone: optional_string(c, "phone"),
            email: optional_string(c, "email"),
        }),
        loan_amount: optional_number(root, "loanAmount"),
        monthly_income: optional_number(root, "monthlyIncome"),
        monthly_expenses: optional_number(root, "monthlyExpenses"),
    })
}

pub fn decode_solvency(text: &str) -> Result<SolvencyResult> {
    let mapping = parse_mapping_literal(text)?;

    let credit_score = mapping_number(&mapping, "score")?;
    if !(0.0..=100.0).contains(&credit_score) {
        return Err(LoanError::format_error(
            "score",
            credit_score.to_string(),
            "credit score must lie in [0, 100]",
        ));
    }
    let financial_capacity = mapping_number(&mapping, "financial_cap")?;

    Ok(SolvencyResult {
        credit_score,
        financial_capacity,
    })
}

pub fn decode_property_evaluation(text: &str) -> Result<PropertyEvaluationResult> {
    let mapping = parse_mapping_literal(text)?;

    let estimated_value = mapping_number(&mapping, "valeur")?;
    if estimated_value < 0.0 {
        return Err(LoanError::format_error(
            "valeur",
            estimated_value.to_string(),
            "estimated value cannot be negative",
        ));
    }

    let has_litigation = match mapping.get("litiges") {
        Some(Literal::Bool(b)) => *b,
        Some(Literal::Number(n)) if *n == 0.0 => false,
        Some(Literal::Number(n)) if *n == 1.0 => true,
        Some(other) => {
            return Err(LoanError::format_error(
                "litiges",
                other.to_string(),
                "expected a boolean",
            ))
        }
        None => return Err(LoanError::field_missing("litiges")),
    };

    Ok(PropertyEvaluationResult {
        estimated_value,
        has_litigation,
    })
}

/// Leading integer of a `"<n>m2"` surface, e.g. `"120m2"` -> 120.
pub fn parse_surface_area(value: &Value) -> Result<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                LoanError::format_error("surfaceArea", n.to_string(), "expected a whole number")
            }),
        Value::String(s) => {
            let trimmed = s.trim_start();
            let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return Err(LoanError::format_error(
                    "surfaceArea",
                    s.clone(),
                    "does not start with an integer",
                ));
            }
            digits
                .parse::<u32>()
                .map_err(|e| LoanError::format_error("surfaceArea", s.clone(), e.to_string()))
        }
        other => Err(LoanError::format_error(
            "surfaceArea",
            other.to_string(),
            "expected a string such as \"120m2\"",
        )),
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn required_object<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Map<String, Value>> {
    match obj.get(key) {
        Some(Value::Object(inner)) => Ok(inner),
        Some(Value::Null) | None => Err(LoanError::field_missing(path)),
        Some(other) => Err(LoanError::format_error(path, other.to_string(), "expected an object")),
    }
}

fn required_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Null) | None => Err(LoanError::field_missing(path)),
        Some(Value::String(_)) => Err(LoanError::field_missing(path)),
        Some(other) => Err(LoanError::format_error(path, other.to_string(), "expected a string")),
    }
}

fn required_number(obj: &Map<String, Value>, key: &str, path: &str) -> Result<f64> {
    match obj.get(key) {
        Some(Value::Null) | None => Err(LoanError::field_missing(path)),
        Some(value) => json_number(value)
            .ok_or_else(|| LoanError::format_error(path, value.to_string(), "expected a number")),
    }
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(json_number)
}

/// A value allowed inside a mapping literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Number(f64),
    Bool(bool),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
        }
    }
}

/// Inverse of [`parse_mapping_literal`], keeping entry order.
pub fn render_mapping_literal(entries: &[(&str, Literal)]) -> String {
    let body = entries
        .iter()
        .map(|(key, value)| format!("'{}': {}", key, value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

fn mapping_number(mapping: &BTreeMap<String, Literal>, key: &str) -> Result<f64> {
    match mapping.get(key) {
        Some(Literal::Number(n)) => Ok(*n),
        Some(other) => Err(LoanError::format_error(key, other.to_string(), "expected a number")),
        None => Err(LoanError::field_missing(key)),
    }
}

/// Parses `{'key': value, ...}` where values are numbers or booleans.
pub fn parse_mapping_literal(text: &str) -> Result<BTreeMap<String, Literal>> {
    MappingParser::new(text).parse()
}

struct MappingParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> MappingParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> LoanError {
        LoanError::format_error(
            "mapping",
            preview(self.source),
            format!("{} at offset {}", reason.into(), self.pos),
        )
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn parse(mut self) -> Result<BTreeMap<String, Literal>> {
        let mut entries = BTreeMap::new();
        self.expect('{')?;

        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }

            let key = self.parse_key()?;
            self.expect(':')?;
            let value = self.parse_value()?;
            if entries.insert(key.clone(), value).is_some() {
                return Err(self.error(format!("duplicate key '{}'", key)));
            }

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
                None => return Err(self.error("unterminated mapping")),
            }
        }

        self.skip_whitespace();
        if self.pos != self.chars.len() {
            return Err(self.error("trailing characters after mapping"));
        }
        Ok(entries)
    }

    fn parse_key(&mut self) -> Result<String> {
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted key")),
        };
        self.pos += 1;

        let mut key = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    let escaped = self
                        .chars
                        .get(self.pos + 1)
                        .copied()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    key.push(escaped);
                    self.pos += 2;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(key);
                }
                Some(c) => {
                    key.push(c);
                    self.pos += 1;
                }
                None => return Err(self.error("unterminated key")),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Literal> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_')) {
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();

        match token.as_str() {
            "" => Err(self.error("expected a value")),
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            _ => {
                let starts_numeric = token
                    .chars()
                    .next()
                    .map(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
                    .unwrap_or(false);
                match token.replace('_', "").parse::<f64>() {
                    Ok(n) if starts_numeric && n.is_finite() => Ok(Literal::Number(n)),
                    _ => Err(self.error(format!("unsupported literal '{}'", token))),
                }
            }
        }
    }
}
