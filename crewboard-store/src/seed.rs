//! Member provisioning from a TOML seed file.
//!
//! ```toml
//! [[members]]
//! full_name = "Ana Ruiz"
//! email = "ana@example.org"
//! committee = "Food"
//! role = "Kitchen lead"
//! is_leader = true
//! ```
//!
//! Rows without an `id` get a fresh one on every load.

use std::path::{Path, PathBuf};

use crewboard_proto::member::{Member, MemberId, PresenceStatus};

/// Errors that can occur when loading a seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Failed to read the seed file.
    #[error("failed to read seed file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the seed TOML.
    #[error("failed to parse seed file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SeedFile {
    members: Vec<SeedMember>,
}

#[derive(Debug, serde::Deserialize)]
struct SeedMember {
    id: Option<MemberId>,
    full_name: String,
    email: String,
    committee: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    status: PresenceStatus,
    #[serde(default)]
    is_leader: bool,
    avatar_url: Option<String>,
}

impl From<SeedMember> for Member {
    fn from(seed: SeedMember) -> Self {
        Self {
            id: seed.id.unwrap_or_default(),
            full_name: seed.full_name,
            email: seed.email,
            committee: seed.committee,
            role: seed.role,
            status: seed.status,
            is_leader: seed.is_leader,
            avatar_url: seed.avatar_url,
        }
    }
}

/// Parses seed members from TOML text.
///
/// # Errors
///
/// Returns [`SeedError::ParseToml`] if the text is not a valid seed file.
pub fn parse_members(text: &str) -> Result<Vec<Member>, SeedError> {
    let file: SeedFile = toml::from_str(text)?;
    Ok(file.members.into_iter().map(Member::from).collect())
}

/// Reads and parses seed members from a file.
///
/// # Errors
///
/// Returns [`SeedError`] if the file cannot be read or parsed.
pub fn load_members(path: &Path) -> Result<Vec<Member>, SeedError> {
    let text = std::fs::read_to_string(path).map_err(|e| SeedError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_members(&text)
}
