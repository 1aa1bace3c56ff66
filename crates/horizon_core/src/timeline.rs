//! Cashflow schedule construction
//!
//! Turns the snapshot's contribution, expense and property rules into a
//! month-indexed list of signed cashflows over the horizon, and derives the
//! retirement and benefit start months.

use jiff::civil::Date;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::model::{Frequency, RealEstate, Snapshot};
use crate::mortgage::{MortgagePayoff, payoff_months};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashFlowKind {
    Contribution,
    Expense,
    Property,
}

/// A dated portfolio inflow (positive) or outflow (negative)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub month_index: usize,
    pub amount: f64,
    pub kind: CashFlowKind,
}

/// Payoff timing of one property's mortgage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMortgage {
    pub property_id: String,
    pub payoff: MortgagePayoff,
}

/// Month-indexed cashflow schedule for one horizon.
///
/// `cashflows` is sorted ascending by `month_index`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub months: usize,
    pub retirement_at_month: Option<usize>,
    pub benefit_start_month: Option<usize>,
    pub cashflows: Vec<CashFlow>,
    pub mortgages: Vec<PropertyMortgage>,
}

impl Timeline {
    /// Net scheduled cashflow per month, `months` entries long.
    #[must_use]
    pub fn net_cashflows_by_month(&self) -> Vec<f64> {
        let mut net = vec![0.0; self.months];
        for cf in &self.cashflows {
            if let Some(slot) = net.get_mut(cf.month_index) {
                *slot += cf.amount;
            }
        }
        net
    }
}

/// Parse an ISO date, date-time, timestamp or `YYYY-MM` string into a civil date.
pub(crate) fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    if let Ok(date) = value.parse::<Date>() {
        return Some(date);
    }
    if let Ok(ts) = value.parse::<jiff::Timestamp>() {
        return Some(ts.to_zoned(TimeZone::UTC).date());
    }
    if let Ok(dt) = value.parse::<jiff::civil::DateTime>() {
        return Some(dt.date());
    }
    if value.len() == 7 {
        return format!("{value}-01").parse::<Date>().ok();
    }
    None
}

/// Calendar-month difference between two dates: `(y2-y1)*12 + (m2-m1)`.
#[must_use]
pub fn month_offset(start: Date, date: Date) -> i64 {
    (i64::from(date.year()) - i64::from(start.year())) * 12
        + (i64::from(date.month()) - i64::from(start.month()))
}

fn month_index_from(start: Option<Date>, value: Option<&str>) -> Option<i64> {
    let start = start?;
    let date = parse_date(value?)?;
    Some(month_offset(start, date))
}

fn months_from_years(years: f64) -> usize {
    (years.max(0.0) * 12.0).round() as usize
}

fn expand_rule(
    flows: &mut Vec<CashFlow>,
    frequency: Frequency,
    start: i64,
    end: i64,
    months: usize,
    amount: f64,
    kind: CashFlowKind,
) {
    let months = months as i64;
    let step = match frequency {
        Frequency::Once => {
            if (0..months).contains(&start) {
                flows.push(CashFlow {
                    month_index: start as usize,
                    amount,
                    kind,
                });
            }
            return;
        }
        Frequency::Monthly => 1,
        Frequency::Annual => 12,
    };

    let mut m = start.max(0);
    while m <= end && m < months {
        flows.push(CashFlow {
            month_index: m as usize,
            amount,
            kind,
        });
        m += step;
    }
}

fn property_flows(property: &RealEstate, months: usize, flows: &mut Vec<CashFlow>) -> MortgagePayoff {
    let taxes = property.taxes.unwrap_or(0.0);
    let insurance = property.insurance.unwrap_or(0.0);
    let maintenance = property.maintenance_pct.unwrap_or(0.0) * property.value;
    let rental_net = property.rental.as_ref().map_or(0.0, |r| {
        r.rent * (1.0 - r.vacancy_pct.unwrap_or(0.0)) - r.expenses.unwrap_or(0.0)
    });
    let carry = -(taxes / 12.0 + insurance / 12.0 + maintenance / 12.0);

    let payment = property.payment.unwrap_or(0.0).max(0.0);
    let payoff = payoff_months(
        property.mortgage_balance.unwrap_or(0.0),
        property.rate.unwrap_or(0.0),
        payment,
        months,
    );
    let payment_months = payoff.payment_months(months);

    for m in 0..months {
        let mortgage = if m < payment_months { -payment } else { 0.0 };
        let net = rental_net + carry + mortgage;
        if net != 0.0 {
            flows.push(CashFlow {
                month_index: m,
                amount: net,
                kind: CashFlowKind::Property,
            });
        }
    }

    payoff
}

/// Build the cashflow schedule of `snapshot` over `years`.
#[must_use]
pub fn build_timeline(snapshot: &Snapshot, years: f64) -> Timeline {
    let months = months_from_years(years).max(1);
    let start = parse_date(&snapshot.timestamp);
    if start.is_none() {
        tracing::warn!(
            timestamp = %snapshot.timestamp,
            "Unparseable snapshot timestamp, dated rules fall back to horizon bounds"
        );
    }
    let default_end = months as i64 - 1;

    let mut flows = Vec::new();

    for c in &snapshot.contributions {
        if c.amount == 0.0 || !c.amount.is_finite() {
            continue;
        }
        let s = month_index_from(start, c.start.as_deref()).unwrap_or(0);
        let e = month_index_from(start, c.end.as_deref()).unwrap_or(default_end);
        expand_rule(&mut flows, c.frequency, s, e, months, c.amount, CashFlowKind::Contribution);
    }

    for ex in &snapshot.expenses {
        if ex.amount == 0.0 || !ex.amount.is_finite() {
            continue;
        }
        let s = month_index_from(start, ex.start.as_deref()).unwrap_or(0);
        let e = month_index_from(start, ex.end.as_deref()).unwrap_or(default_end);
        expand_rule(&mut flows, ex.frequency, s, e, months, -ex.amount.abs(), CashFlowKind::Expense);
    }

    let mortgages = snapshot
        .real_estate
        .iter()
        .map(|property| PropertyMortgage {
            property_id: property.id.clone(),
            payoff: property_flows(property, months, &mut flows),
        })
        .collect();

    let current_age = snapshot.current_age();

    let retirement_at_month = month_index_from(start, snapshot.retirement.target_date.as_deref())
        .map(|m| m.max(0) as usize)
        .or_else(|| {
            let target = snapshot.retirement.target_age?;
            let age = current_age?;
            Some(months_from_years(target - age))
        });

    let benefit_start_month = current_age.and_then(|age| {
        snapshot
            .social_security
            .iter()
            .map(|ss| months_from_years(ss.claim_age - age))
            .min()
    });

    // Stable sort keeps rule order within a month
    flows.sort_by_key(|cf| cf.month_index);

    Timeline {
        months,
        retirement_at_month,
        benefit_start_month,
        cashflows: flows,
        mortgages,
    }
}
