//! Portfolio snapshot consumed by the engine
//!
//! A snapshot is produced by an external collaborator (data entry, importer)
//! and is read-only for the duration of a simulation request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Reference date of the snapshot (ISO 8601 date or date-time)
    pub timestamp: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub real_estate: Vec<RealEstate>,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub retirement: RetirementPlan,
    #[serde(default)]
    pub social_security: Vec<SocialSecurity>,
    #[serde(default)]
    pub assumptions: Option<Assumptions>,
    #[serde(default)]
    pub person: Option<PersonProfile>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Snapshot {
    /// Current age of the person, if known
    #[must_use]
    pub fn current_age(&self) -> Option<f64> {
        self.person.as_ref().and_then(|p| p.current_age)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub cash_balance: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Holding {
    #[serde(default)]
    pub ticker: Option<String>,
    /// Free-form class label used when no ticker is present
    #[serde(default)]
    pub asset_class: Option<String>,
    pub units: f64,
    pub price: f64,
    #[serde(default)]
    pub cost_basis: Option<f64>,
}

impl Holding {
    #[must_use]
    pub fn value(&self) -> f64 {
        self.units * self.price
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealEstate {
    pub id: String,
    pub value: f64,
    #[serde(default)]
    pub mortgage_balance: Option<f64>,
    /// Annual mortgage rate
    #[serde(default)]
    pub rate: Option<f64>,
    /// Monthly mortgage payment
    #[serde(default)]
    pub payment: Option<f64>,
    /// Annual property taxes
    #[serde(default)]
    pub taxes: Option<f64>,
    /// Annual insurance
    #[serde(default)]
    pub insurance: Option<f64>,
    /// Annual maintenance as a fraction of value
    #[serde(default)]
    pub maintenance_pct: Option<f64>,
    #[serde(default)]
    pub rental: Option<RentalInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RentalInfo {
    /// Monthly rent
    pub rent: f64,
    #[serde(default)]
    pub vacancy_pct: Option<f64>,
    /// Monthly rental expenses
    #[serde(default)]
    pub expenses: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Monthly,
    Annual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    #[serde(default)]
    pub account_id: String,
    pub amount: f64,
    pub frequency: Frequency,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub amount: f64,
    pub frequency: Frequency,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetirementPlan {
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub target_age: Option<f64>,
    /// Monthly spend in today's dollars
    #[serde(default)]
    pub expected_spend_monthly: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSecurity {
    pub claim_age: f64,
    /// Monthly benefit in today's dollars
    pub monthly_amount: f64,
    #[serde(default, rename = "COLA", alias = "cola")]
    pub cola: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceFrequency {
    Monthly,
    Quarterly,
    #[default]
    Annual,
}

impl RebalanceFrequency {
    /// Rebalancing interval in months
    #[must_use]
    pub const fn interval_months(self) -> usize {
        match self {
            RebalanceFrequency::Monthly => 1,
            RebalanceFrequency::Quarterly => 3,
            RebalanceFrequency::Annual => 12,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebalancingPolicy {
    #[serde(default)]
    pub frequency: Option<RebalanceFrequency>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assumptions {
    /// Annual inflation rate
    #[serde(default)]
    pub inflation_pct: Option<f64>,
    #[serde(default)]
    pub rebalancing: Option<RebalancingPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonProfile {
    #[serde(default)]
    pub current_age: Option<f64>,
}
