//! Distance cutoff selection for flat clustering.
//!
//! The cutoff adapts to the tree's own distance distribution: it is a
//! percentile of one statistic taken per merge step.

use super::linkage::{Merge, MergeTree};
use crate::error::{KolosalError, Result};
use crate::utils::percentile;
use serde::{Deserialize, Serialize};

/// Which per-merge value feeds the percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeStatistic {
    /// Minimum over the merge record's numeric fields (both child ids, the
    /// distance and the merged size), i.e. the row minimum of a SciPy-style
    /// linkage matrix.
    #[default]
    RowMinimum,
    /// The merge distance alone.
    MergeDistance,
}

impl MergeStatistic {
    pub fn value(self, merge: &Merge) -> f64 {
        match self {
            MergeStatistic::RowMinimum => (merge.left as f64)
                .min(merge.right as f64)
                .min(merge.distance)
                .min(merge.size as f64),
            MergeStatistic::MergeDistance => merge.distance,
        }
    }
}

/// Percentile cutoff heuristic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoffPolicy {
    /// Percentile in `[0, 100]`
    pub percentile: f64,
    pub statistic: MergeStatistic,
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        Self {
            percentile: 99.5,
            statistic: MergeStatistic::RowMinimum,
        }
    }
}

impl CutoffPolicy {
    pub fn new(percentile: f64) -> Self {
        Self {
            percentile,
            ..Default::default()
        }
    }

    pub fn with_statistic(mut self, statistic: MergeStatistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(KolosalError::invalid_parameter(
                "cutoff_percentile",
                self.percentile,
                "must be within [0, 100]",
            ));
        }
        Ok(())
    }

    /// Per-merge statistic, one value per merge step in tree order.
    pub fn statistics(&self, tree: &MergeTree) -> Vec<f64> {
        tree.merges().iter().map(|m| self.statistic.value(m)).collect()
    }

    /// The cutoff distance for `tree`.
    pub fn cutoff(&self, tree: &MergeTree) -> Result<f64> {
        self.validate()?;
        percentile(&self.statistics(tree), self.percentile)
    }
}
