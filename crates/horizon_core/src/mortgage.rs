//! Mortgage amortization
//!
//! Interest-only and negatively amortizing loans never pay off; they run to
//! the horizon. That case is reported explicitly through
//! [`MortgagePayoff::NeverWithinHorizon`] and the `negative_amortization`
//! flag instead of being left for callers to infer from a stagnant balance.

use serde::{Deserialize, Serialize};

/// Balance below which a loan counts as paid off
const PAID_OFF_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmortizationMonth {
    pub month: usize,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub months: Vec<AmortizationMonth>,
    /// Number of payments until the balance reaches zero
    pub paid_off_at_month: Option<usize>,
    /// Payment does not cover the monthly interest; the loan never amortizes
    pub negative_amortization: bool,
}

/// How long the payment stream on a loan lasts within a horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MortgagePayoff {
    /// No balance or no payment: nothing to pay
    NoPayments,
    /// Paid off after this many monthly payments
    PaidOff(usize),
    /// Payments continue through the horizon and beyond
    NeverWithinHorizon { negative_amortization: bool },
}

impl MortgagePayoff {
    /// Number of payment months inside a horizon of `horizon` months.
    #[must_use]
    pub fn payment_months(self, horizon: usize) -> usize {
        match self {
            MortgagePayoff::NoPayments => 0,
            MortgagePayoff::PaidOff(n) => n.min(horizon),
            MortgagePayoff::NeverWithinHorizon { .. } => horizon,
        }
    }

    #[must_use]
    pub fn is_negative_amortization(self) -> bool {
        matches!(
            self,
            MortgagePayoff::NeverWithinHorizon {
                negative_amortization: true
            }
        )
    }
}

/// Closed-form payoff timing for a loan with a fixed monthly payment.
#[must_use]
pub fn payoff_months(principal: f64, annual_rate: f64, payment: f64, horizon: usize) -> MortgagePayoff {
    let p = principal.max(0.0);
    let pmt = payment.max(0.0);
    let r = annual_rate.max(0.0) / 12.0;

    if p <= 0.0 || pmt <= 0.0 {
        return MortgagePayoff::NoPayments;
    }

    let months = if r == 0.0 {
        (p / pmt).ceil()
    } else if pmt > p * r {
        // n = ln(pmt / (pmt - rP)) / ln(1 + r)
        ((pmt / (pmt - r * p)).ln() / (1.0 + r).ln()).ceil()
    } else {
        return MortgagePayoff::NeverWithinHorizon {
            negative_amortization: true,
        };
    };

    let months = months as usize;
    if months > horizon {
        MortgagePayoff::NeverWithinHorizon {
            negative_amortization: false,
        }
    } else {
        MortgagePayoff::PaidOff(months)
    }
}

/// Month-by-month amortization schedule, capped at `max_months`.
#[must_use]
pub fn amortization_schedule(
    principal: f64,
    annual_rate: f64,
    payment: f64,
    max_months: usize,
) -> AmortizationSchedule {
    let mut balance = principal.max(0.0);
    let r = annual_rate.max(0.0) / 12.0;
    let pmt = payment.max(0.0);

    if balance == 0.0 || pmt == 0.0 {
        return AmortizationSchedule {
            months: vec![AmortizationMonth {
                month: 0,
                interest: 0.0,
                principal: 0.0,
                balance,
            }],
            paid_off_at_month: None,
            negative_amortization: false,
        };
    }

    let negative_amortization = r > 0.0 && pmt <= balance * r;
    let mut months = Vec::new();
    let mut paid_off_at_month = None;

    for m in 0..max_months {
        let interest = balance * r;
        let principal_paid = (pmt - interest).max(0.0);
        balance -= principal_paid;
        if balance < PAID_OFF_EPSILON {
            balance = 0.0;
            months.push(AmortizationMonth {
                month: m,
                interest,
                principal: principal_paid,
                balance,
            });
            paid_off_at_month = Some(m + 1);
            break;
        }
        months.push(AmortizationMonth {
            month: m,
            interest,
            principal: principal_paid,
            balance,
        });
    }

    AmortizationSchedule {
        months,
        paid_off_at_month,
        negative_amortization,
    }
}
