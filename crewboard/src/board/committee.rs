//! Committee labels.
//!
//! Committees are free-text labels carried by members and tasks. The board
//! only accepts labels that some loaded member actually carries; `"all"` is
//! reserved for "no committee restriction".

use std::fmt;

use crewboard_proto::member::Member;

/// Reserved label meaning "every committee".
pub const ALL_COMMITTEES: &str = "all";

/// Committee filter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CommitteeFilter {
    /// No committee restriction.
    #[default]
    All,
    /// Exactly one committee.
    Named(String),
}

impl CommitteeFilter {
    /// Parses a raw label: empty or `"all"` (any case) is [`Self::All`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(ALL_COMMITTEES) {
            Self::All
        } else {
            Self::Named(label.to_string())
        }
    }

    /// The committee name, or `None` for [`Self::All`].
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(name) => Some(name),
        }
    }

    /// Whether a task with this committee passes the filter.
    ///
    /// Tasks without a committee are visible under every filter.
    #[must_use]
    pub fn admits(&self, task_committee: Option<&str>) -> bool {
        match (self, task_committee) {
            (Self::All, _) | (_, None) => true,
            (Self::Named(name), Some(committee)) => name == committee,
        }
    }
}

impl fmt::Display for CommitteeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "{ALL_COMMITTEES}"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// The set of known committees, in first-seen member order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitteeSet {
    names: Vec<String>,
}

impl CommitteeSet {
    /// Collects the distinct committees of `members`.
    #[must_use]
    pub fn from_members(members: &[Member]) -> Self {
        let mut names: Vec<String> = Vec::new();
        for member in members {
            if !names.iter().any(|n| n == &member.committee) {
                names.push(member.committee.clone());
            }
        }
        Self { names }
    }

    /// Known committee names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is a known committee.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Resolves a raw label to a task committee value.
    ///
    /// Returns `Ok(None)` for the reserved sentinel or an empty label and
    /// `Ok(Some(name))` for a known committee.
    ///
    /// # Errors
    ///
    /// Returns the trimmed label back if no member carries it.
    pub fn resolve(&self, label: &str) -> Result<Option<String>, String> {
        match CommitteeFilter::from_label(label) {
            CommitteeFilter::All => Ok(None),
            CommitteeFilter::Named(name) if self.contains(&name) => Ok(Some(name)),
            CommitteeFilter::Named(name) => Err(name),
        }
    }

    /// Filter choices for the UI: [`CommitteeFilter::All`] first.
    #[must_use]
    pub fn filters(&self) -> Vec<CommitteeFilter> {
        std::iter::once(CommitteeFilter::All)
            .chain(self.names.iter().cloned().map(CommitteeFilter::Named))
            .collect()
    }
}
