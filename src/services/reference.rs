//! Read-only reference tables consulted by the solvency and property services.

use crate::utils::error::Result;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const DEFAULT_PRICE_PER_AREA: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditRecord {
    pub outstanding_debt: f64,
    pub late_payments: u32,
    pub has_bankruptcy: bool,
}

impl CreditRecord {
    pub const CLEAN: CreditRecord = CreditRecord {
        outstanding_debt: 0.0,
        late_payments: 0,
        has_bankruptcy: false,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRecord {
    pub name: Option<String>,
    pub address: Option<String>,
    pub monthly_income: f64,
    pub monthly_expense: f64,
}

#[derive(Debug, Deserialize)]
struct CreditRow {
    customer_id: String,
    outstanding_debt: f64,
    late_payments: u32,
    has_bankruptcy: bool,
}

#[derive(Debug, Deserialize)]
struct FinancialRow {
    customer_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    monthly_income: f64,
    monthly_expense: f64,
}

#[derive(Debug, Deserialize)]
struct LitigationRow {
    address: String,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    town: String,
    price_per_area: f64,
}

#[derive(Debug, Clone)]
pub struct ReferenceData {
    credit_history: HashMap<String, CreditRecord>,
    financial_records: HashMap<String, FinancialRecord>,
    litigation_addresses: HashSet<String>,
    price_per_area: HashMap<String, f64>,
    default_price_per_area: f64,
}

impl Default for ReferenceData {
    fn default() -> Self {
        let credit_history = [
            ("client-001", 5000.0, 2, false),
            ("client-002", 2000.0, 0, false),
            ("client-003", 10000.0, 5, true),
        ]
        .into_iter()
        .map(|(id, debt, late, bankrupt)| {
            (
                id.to_string(),
                CreditRecord {
                    outstanding_debt: debt,
                    late_payments: late,
                    has_bankruptcy: bankrupt,
                },
            )
        })
        .collect();

        let financial_records = [
            ("client-001", "John Doe", "123 Neuilly St", 4000.0, 3000.0),
            ("client-002", "Alice Smith", "456 Elm St", 3000.0, 2500.0),
            ("client-003", "Bob Johnson", "789 MaOakin St", 6000.0, 5500.0),
        ]
        .into_iter()
        .map(|(id, name, address, income, expense)| {
            (
                id.to_string(),
                FinancialRecord {
                    name: Some(name.to_string()),
                    address: Some(address.to_string()),
                    monthly_income: income,
                    monthly_expense: expense,
                },
            )
        })
        .collect();

        let litigation_addresses = [
            "45 boulevard de mousse, Neuilly-Plaisance",
            "19 Rue de la republique, Versailles",
            "11 rue des saints, Paris",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let price_per_area = [("Versailles", 300.0), ("Paris", 350.0), ("Bordeaux", 200.0)]
            .into_iter()
            .map(|(town, price)| (town.to_string(), price))
            .collect();

        Self {
            credit_history,
            financial_records,
            litigation_addresses,
            price_per_area,
            default_price_per_area: DEFAULT_PRICE_PER_AREA,
        }
    }
}

impl ReferenceData {
    /// Built-in tables, with each table replaced by its CSV file when present in `dir`.
    ///
    /// Recognised files: `credit_history.csv`, `financial_records.csv`,
    /// `litigation_addresses.csv`, `price_per_area.csv`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut data = Self::default();

        if let Some(rows) = read_rows::<CreditRow>(&dir.join("credit_history.csv"))? {
            data.credit_history = rows
                .into_iter()
                .map(|r| {
                    let record = CreditRecord {
                        outstanding_debt: r.outstanding_debt,
                        late_payments: r.late_payments,
                        has_bankruptcy: r.has_bankruptcy,
                    };
                    (r.customer_id, record)
                })
                .collect();
        }
        if let Some(rows) = read_rows::<FinancialRow>(&dir.join("financial_records.csv"))? {
            data.financial_records = rows
                .into_iter()
                .map(|r| {
                    let record = FinancialRecord {
                        name: r.name,
                        address: r.address,
                        monthly_income: r.monthly_income,
                        monthly_expense: r.monthly_expense,
                    };
                    (r.customer_id, record)
                })
                .collect();
        }
        if let Some(rows) = read_rows::<LitigationRow>(&dir.join("litigation_addresses.csv"))? {
            data.litigation_addresses = rows.into_iter().map(|r| r.address).collect();
        }
        if let Some(rows) = read_rows::<PriceRow>(&dir.join("price_per_area.csv"))? {
            data.price_per_area = rows.into_iter().map(|r| (r.town, r.price_per_area)).collect();
        }

        Ok(data)
    }

    pub fn with_default_price_per_area(mut self, price: f64) -> Self {
        self.default_price_per_area = price;
        self
    }

    /// Unknown customers have a clean record.
    pub fn credit_record(&self, customer_id: &str) -> CreditRecord {
        self.credit_history
            .get(customer_id)
            .copied()
            .unwrap_or(CreditRecord::CLEAN)
    }

    /// `(monthly_income, monthly_expense)`, zero for unknown customers.
    pub fn financials(&self, customer_id: &str) -> (f64, f64) {
        self.financial_records
            .get(customer_id)
            .map(|r| (r.monthly_income, r.monthly_expense))
            .unwrap_or((0.0, 0.0))
    }

    pub fn customer_details(&self, customer_id: &str) -> Option<&FinancialRecord> {
        self.financial_records.get(customer_id)
    }

    pub fn has_litigation(&self, address: &str) -> bool {
        self.litigation_addresses.contains(address)
    }

    pub fn price_per_area(&self, town: &str) -> f64 {
        self.price_per_area
            .get(town)
            .copied()
            .unwrap_or(self.default_price_per_area)
    }
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    tracing::info!("📚 Loaded {} reference rows from {}", rows.len(), path.display());
    Ok(Some(rows))
}
