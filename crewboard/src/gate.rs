//! Admin gate in front of the board.
//!
//! The board only needs a yes/no answer: is this session an admin.

/// Outcome of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdminSession {
    admin: bool,
}

impl AdminSession {
    /// A session that has not passed the gate.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { admin: false }
    }

    /// Whether the board may be shown.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.admin
    }
}

/// Shared-password check.
///
/// With no password configured the gate stays closed.
#[derive(Debug, Clone, Default)]
pub struct PasswordGate {
    password: Option<String>,
}

impl PasswordGate {
    /// Creates a gate for `password`. An empty password counts as none.
    #[must_use]
    pub fn new(password: Option<String>) -> Self {
        Self {
            password: password.filter(|p| !p.is_empty()),
        }
    }

    /// Whether any password is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.password.is_some()
    }

    /// Checks `candidate` and returns the resulting session.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> AdminSession {
        let admin = self
            .password
            .as_deref()
            .is_some_and(|expected| constant_time_eq(expected.as_bytes(), candidate.as_bytes()));
        if admin {
            tracing::info!("admin login accepted");
        } else {
            tracing::warn!("admin login rejected");
        }
        AdminSession { admin }
    }
}

/// Compares two byte strings without returning early on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
