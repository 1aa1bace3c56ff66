//! Month-by-month path simulation
//!
//! Each month applies returns to every class, routes the scheduled cashflow,
//! retirement spend and benefits through the cash bucket, rebalances on
//! schedule and checks the total. A path whose total reaches zero or below
//! stops there.

use crate::bootstrap::BootstrapSampler;
use crate::config::ReturnParams;
use crate::model::{AssetArray, AssetClass, DeterministicResult, PathResult};
use crate::random::RandomContext;

/// Inputs shared by every path of a request
#[derive(Debug, Clone, PartialEq)]
pub struct PathParams {
    pub initial_total: f64,
    /// Target weights, also used to seed the initial balances
    pub weights: AssetArray<f64>,
    pub months: usize,
    /// Annual inflation
    pub inflation: f64,
    /// Rebalance every this many months; 0 disables rebalancing
    pub rebalance_every: usize,
    /// Retirement spend per month in today's dollars
    pub spend_monthly: f64,
    /// Benefit per month in today's dollars
    pub benefit_monthly: f64,
    /// Net scheduled cashflow per month
    pub cashflows: Vec<f64>,
    pub retirement_start: Option<usize>,
    pub benefit_start: Option<usize>,
}

/// Cash movements of one month
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthFlow {
    pub scheduled: f64,
    pub spend: f64,
    pub benefit: f64,
}

impl MonthFlow {
    #[must_use]
    pub fn net(&self) -> f64 {
        self.scheduled - self.spend + self.benefit
    }
}

impl PathParams {
    /// Scheduled cashflow, inflation-indexed spend and benefit for month `m`.
    ///
    /// Spend is indexed from the retirement month, the benefit from month 0.
    #[must_use]
    pub fn month_flow(&self, m: usize) -> MonthFlow {
        let infl_m = (1.0 + self.inflation).ln() / 12.0;
        let scheduled = self.cashflows.get(m).copied().unwrap_or(0.0);
        let spend = match self.retirement_start {
            Some(start) if m >= start => self.spend_monthly * (infl_m * (m - start) as f64).exp(),
            _ => 0.0,
        };
        let benefit = match self.benefit_start {
            Some(start) if m >= start => self.benefit_monthly * (infl_m * m as f64).exp(),
            _ => 0.0,
        };
        MonthFlow {
            scheduled,
            spend,
            benefit,
        }
    }
}

/// Where a path's monthly returns come from
#[derive(Debug, Clone)]
pub enum ReturnSource {
    /// Block-bootstrapped history. Classes the sampler does not cover draw
    /// from `fallback` parametrically.
    Historical {
        sampler: BootstrapSampler,
        fallback: AssetArray<ReturnParams>,
    },
    /// Lognormal draws, `r = exp(muM + sigmaM * z) - 1`
    Parametric(AssetArray<ReturnParams>),
    /// Expected returns only, `r = exp(muM) - 1`
    Deterministic(AssetArray<ReturnParams>),
}

/// A return source with its monthly parameters resolved once per path
struct ReturnDraw<'a> {
    source: &'a mut ReturnSource,
    monthly: AssetArray<(f64, f64)>,
    from_history: AssetArray<bool>,
}

impl<'a> ReturnDraw<'a> {
    fn new(source: &'a mut ReturnSource) -> Self {
        let (params, from_history) = match &*source {
            ReturnSource::Historical { sampler, fallback } => {
                let mut covered = AssetArray::splat(false);
                for &class in sampler.assets() {
                    covered[class] = true;
                }
                (*fallback, covered)
            }
            ReturnSource::Parametric(params) | ReturnSource::Deterministic(params) => {
                (*params, AssetArray::splat(false))
            }
        };
        Self {
            source,
            monthly: AssetArray::from_fn(|class| params[class].monthly()),
            from_history,
        }
    }

    fn next(&mut self, rng: &mut RandomContext) -> AssetArray<f64> {
        let monthly = &self.monthly;
        match self.source {
            ReturnSource::Parametric(_) => AssetArray::from_fn(|class| {
                let (mu, sigma) = monthly[class];
                (mu + sigma * rng.randn()).exp() - 1.0
            }),
            ReturnSource::Deterministic(_) => AssetArray::from_fn(|class| monthly[class].0.exp() - 1.0),
            ReturnSource::Historical { sampler, .. } => {
                let mut returns = sampler.next(rng);
                for class in AssetClass::ALL {
                    if !self.from_history[class] {
                        let (mu, sigma) = monthly[class];
                        returns[class] = (mu + sigma * rng.randn()).exp() - 1.0;
                    }
                }
                returns
            }
        }
    }
}

/// End state of the stepping loop
struct PathOutcome {
    success: bool,
    terminal: f64,
    min_drawdown: f64,
}

/// Step through the horizon, calling `observe(m, balances, total)` after
/// every month the path survives.
fn step_months(
    params: &PathParams,
    source: &mut ReturnSource,
    rng: &mut RandomContext,
    mut observe: impl FnMut(usize, &AssetArray<f64>, f64),
) -> PathOutcome {
    let mut balances = AssetArray::from_fn(|class| params.initial_total * params.weights[class]);
    let mut draw = ReturnDraw::new(source);
    let mut min_drawdown = params.initial_total;
    let mut total = params.initial_total;

    for m in 0..params.months {
        let returns = draw.next(rng);
        for (class, balance) in balances.iter_mut() {
            *balance *= 1.0 + returns[class];
        }

        let flow = params.month_flow(m);
        balances[AssetClass::Cash] += flow.scheduled;
        balances[AssetClass::Cash] -= flow.spend;
        balances[AssetClass::Cash] += flow.benefit;

        if params.rebalance_every > 0 && (m + 1) % params.rebalance_every == 0 {
            let pre = balances.sum();
            if pre > 0.0 {
                balances = AssetArray::from_fn(|class| params.weights[class] * pre);
            }
        }

        total = balances.sum();
        min_drawdown = min_drawdown.min(total);
        if total <= 0.0 {
            return PathOutcome {
                success: false,
                terminal: 0.0,
                min_drawdown,
            };
        }
        observe(m, &balances, total);
    }

    PathOutcome {
        success: true,
        terminal: total,
        min_drawdown,
    }
}

/// Simulate one path. The trajectory, when recorded, is zero from the
/// failure month onward.
pub fn simulate_path(
    params: &PathParams,
    source: &mut ReturnSource,
    rng: &mut RandomContext,
    record_trajectory: bool,
) -> PathResult {
    let mut trajectory = record_trajectory.then(|| vec![0.0; params.months]);
    let outcome = step_months(params, source, rng, |m, _, total| {
        if let Some(t) = trajectory.as_mut() {
            t[m] = total;
        }
    });
    PathResult {
        success: outcome.success,
        terminal: outcome.terminal,
        min_drawdown: outcome.min_drawdown,
        trajectory,
    }
}

/// Simulate one path recording per-class balances and cumulative net
/// contributions each month.
pub fn simulate_path_detailed(
    params: &PathParams,
    source: &mut ReturnSource,
    rng: &mut RandomContext,
) -> DeterministicResult {
    let months = params.months;
    let mut total = vec![0.0; months];
    let mut by_class: AssetArray<Vec<f64>> = AssetArray::from_fn(|_| vec![0.0; months]);

    let outcome = step_months(params, source, rng, |m, balances, sum| {
        total[m] = sum;
        for (class, balance) in balances.iter() {
            by_class[class][m] = *balance;
        }
    });

    let net_contributions = (0..months)
        .scan(0.0, |acc, m| {
            *acc += params.month_flow(m).net();
            Some(*acc)
        })
        .collect();

    DeterministicResult {
        success: outcome.success,
        terminal: outcome.terminal,
        min_drawdown: outcome.min_drawdown,
        total,
        by_class,
        net_contributions,
    }
}
