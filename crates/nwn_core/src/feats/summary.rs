use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::FeatCatalog;
use crate::rules::ExpectedFeatCount;

/// Manually chosen feats compared with the expected number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceBalance {
    Over(u32),
    Remaining(u32),
    Exact,
}

impl ChoiceBalance {
    pub fn from_counts(selected: usize, expected: u32) -> Self {
        let selected = u32::try_from(selected).unwrap_or(u32::MAX);
        if selected > expected {
            Self::Over(selected - expected)
        } else if selected < expected {
            Self::Remaining(expected - selected)
        } else {
            Self::Exact
        }
    }

    /// Chosen minus expected.
    pub fn delta(&self) -> i64 {
        match *self {
            Self::Over(n) => i64::from(n),
            Self::Remaining(n) => -i64::from(n),
            Self::Exact => 0,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self, Self::Over(_))
    }
}

impl fmt::Display for ChoiceBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Over(n) => write!(f, "+{n} over expected"),
            Self::Remaining(n) => write!(f, "{n} remaining"),
            Self::Exact => f.write_str("matches expected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShownCount {
    pub shown: usize,
    pub total: usize,
}

impl fmt::Display for ShownCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} shown", self.shown, self.total)
    }
}

/// Counts shown beside the feat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatSummary {
    pub assigned: usize,
    pub granted: usize,
    pub selected: usize,
    pub expected: ExpectedFeatCount,
    pub balance: ChoiceBalance,
    pub unavailable: usize,
    /// Present only when the displayed list is a strict subset.
    pub shown: Option<ShownCount>,
    pub no_results: bool,
}

impl FeatSummary {
    pub fn new(
        assigned: usize,
        granted: usize,
        unavailable: usize,
        expected: ExpectedFeatCount,
        shown: usize,
        total: usize,
    ) -> Self {
        let selected = assigned.saturating_sub(granted);
        Self {
            assigned,
            granted,
            selected,
            expected,
            balance: ChoiceBalance::from_counts(selected, expected.total_expected),
            unavailable,
            shown: (shown < total).then_some(ShownCount { shown, total }),
            no_results: shown == 0,
        }
    }

    pub fn from_catalog(catalog: &FeatCatalog, shown: usize) -> Self {
        Self::new(
            catalog.assigned_feat_ids().len(),
            catalog.granted_feat_ids().len(),
            catalog.unavailable_feat_ids().len(),
            catalog.expected(),
            shown,
            catalog.len(),
        )
    }
}
