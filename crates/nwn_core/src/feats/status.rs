use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::FeatId;
use crate::creature::{ClassId, Creature};
use crate::rules::RulesLookup;

/// Where a creature stands with respect to one feat. Exactly one holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Granted,
    Assigned,
    Available,
    PrereqsUnmet,
    Unavailable,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Self::Granted,
        Self::Assigned,
        Self::Available,
        Self::PrereqsUnmet,
        Self::Unavailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Granted => "Granted",
            Self::Assigned => "Assigned",
            Self::Available => "Available",
            Self::PrereqsUnmet => "Prerequisites unmet",
            Self::Unavailable => "Unavailable",
        }
    }

    pub fn key(&self) -> &'static str {
        match *self {
            Self::Granted => "granted",
            Self::Assigned => "assigned",
            Self::Available => "available",
            Self::PrereqsUnmet => "prereqs-unmet",
            Self::Unavailable => "unavailable",
        }
    }

    /// True for the two statuses that mean the feat is in the creature's
    /// feat list.
    pub fn is_on_creature(&self) -> bool {
        matches!(self, Self::Granted | Self::Assigned)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        match wanted.as_str() {
            "granted" => Ok(Self::Granted),
            "assigned" => Ok(Self::Assigned),
            "available" => Ok(Self::Available),
            "prereqs-unmet" | "prereqsunmet" | "unmet" => Ok(Self::PrereqsUnmet),
            "unavailable" => Ok(Self::Unavailable),
            _ => Err(format!("unknown feat status '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantSource {
    Race,
    Class(ClassId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub status: Status,
    /// Set only for granted feats whose source could be determined.
    pub granted_by: Option<GrantSource>,
}

impl Resolution {
    fn plain(status: Status) -> Self {
        Self {
            status,
            granted_by: None,
        }
    }

    pub fn granting_class(&self) -> Option<ClassId> {
        match self.granted_by {
            Some(GrantSource::Class(class)) => Some(class),
            _ => None,
        }
    }
}

/// Classifies one feat for `creature`.
///
/// For assigned feats the race is consulted before the classes, so a feat
/// both could grant is attributed to the race. An assigned feat with no
/// detectable source stays `Granted` only when `known_granted` (the granted
/// set from the last full build) lists it; otherwise it is `Assigned`.
///
/// Unassigned feats are checked for prerequisites first and applicability
/// second.
pub fn resolve<R: RulesLookup + ?Sized>(
    rules: &R,
    creature: &Creature,
    feat: FeatId,
    is_assigned: bool,
    known_granted: &BTreeSet<FeatId>,
) -> Resolution {
    if !is_assigned {
        if !rules.prerequisites_met(creature, feat) {
            return Resolution::plain(Status::PrereqsUnmet);
        }
        if !rules.feat_is_applicable(creature, feat) {
            return Resolution::plain(Status::Unavailable);
        }
        return Resolution::plain(Status::Available);
    }

    if rules.is_granted_by_race(creature, feat) {
        return Resolution {
            status: Status::Granted,
            granted_by: Some(GrantSource::Race),
        };
    }
    if let Some(class) = rules.granting_class(creature, feat) {
        return Resolution {
            status: Status::Granted,
            granted_by: Some(GrantSource::Class(class)),
        };
    }
    if known_granted.contains(&feat) {
        warn!(feat = %feat, "feat kept as granted from an earlier build; no current grant source");
        return Resolution::plain(Status::Granted);
    }
    Resolution::plain(Status::Assigned)
}
