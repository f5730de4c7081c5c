//! Stats module - aggregation and usage categorization

mod calculator;
mod categorizer;

pub use calculator::{
    BoxSummary, CorrelationMatrix, CorrelationVariable, GroupShare, GroupValue, ScatterPoint,
    StatsCalculator, Summary,
};
pub use categorizer::{Categorizer, TierDistribution, TierShare, UsageBins};
