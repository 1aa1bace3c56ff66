mod asset_class;
mod historical;
mod results;
mod snapshot;

pub use asset_class::{AssetArray, AssetClass};
pub use historical::{
    HistoricalDataset, HistoricalDatasetMeta, HistoricalMonthRow, HistoricalStatistics,
};
pub use results::{
    DeterministicResult, MonteSummary, PathResult, PercentileTrajectories, YearEndSeries,
};
pub use snapshot::{
    Account, Assumptions, Contribution, Expense, Frequency, Holding, PersonProfile, RealEstate,
    RebalanceFrequency, RebalancingPolicy, RentalInfo, RetirementPlan, SocialSecurity, Snapshot,
};
