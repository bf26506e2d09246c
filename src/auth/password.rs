/// Password Hashing and Verification
///
/// bcrypt with a fixed work factor chosen once at startup.

use crate::error::AppError;

/// Lowest cost bcrypt accepts
pub const MIN_HASH_COST: u32 = 4;
/// Highest cost bcrypt accepts
pub const MAX_HASH_COST: u32 = 31;
/// Cost used when the configured one is out of range
pub const DEFAULT_HASH_COST: u32 = 10;

/// Salted one-way password hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_HASH_COST,
        }
    }
}

impl PasswordHasher {
    /// Create a hasher. A cost outside `MIN_HASH_COST..=MAX_HASH_COST`
    /// falls back to `DEFAULT_HASH_COST`.
    pub fn new(cost: u32) -> Self {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
            tracing::warn!(
                configured = cost,
                fallback = DEFAULT_HASH_COST,
                "Password hash cost out of range, using default"
            );
            return Self::default();
        }
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a clear-text password
    ///
    /// # Errors
    /// Only when bcrypt itself fails. That is a server fault, never a
    /// property of the input, so it surfaces as `AppError::Internal`.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        bcrypt::hash(password, self.cost).map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            AppError::Internal(format!("Password hashing failed: {}", e))
        })
    }

    /// Check a candidate password against a stored hash.
    ///
    /// A malformed stored hash counts as a mismatch.
    pub fn verify(&self, hash: &str, candidate: &str) -> bool {
        match bcrypt::verify(candidate, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be parsed");
                false
            }
        }
    }
}
