//! Staff and volunteer records.
//!
//! Members are provisioned outside the task board and only ever read by it.
//! The `committee` field is a free-text label compared for equality.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque member identifier assigned by the store (UUID v7).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(Uuid);

impl MemberId {
    /// Creates a new time-ordered member identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `MemberId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MemberId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Presence indicator shown next to a member. Not used by task logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Available.
    #[default]
    Active,
    /// Working on something else.
    Busy,
    /// Temporarily away.
    Away,
    /// Not on shift.
    Offline,
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Busy => write!(f, "busy"),
            Self::Away => write!(f, "away"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// A staff member or volunteer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Store-assigned identifier, unique within a loaded set.
    pub id: MemberId,
    /// Display name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// The single committee this member belongs to.
    pub committee: String,
    /// Free-text job title.
    pub role: String,
    /// Presence indicator.
    #[serde(default)]
    pub status: PresenceStatus,
    /// Display emphasis for committee leads.
    #[serde(default)]
    pub is_leader: bool,
    /// Optional avatar image reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
}
