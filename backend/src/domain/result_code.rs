//! Signed result codes returned by mutating store operations.
//!
//! Stores report the outcome of create, update, patch and delete as a single
//! integer: a positive count of affected records, zero when the target does
//! not exist, or a negative value when a key or unique index collides.

use serde::{Deserialize, Serialize};

/// Raw outcome of a mutating store call.
///
/// # Examples
/// ```
/// use users_api::domain::{Outcome, ResultCode};
///
/// assert_eq!(ResultCode::new(1).outcome(), Outcome::Applied(1));
/// assert_eq!(ResultCode::new(0).outcome(), Outcome::NotFound);
/// assert_eq!(ResultCode::new(-1).outcome(), Outcome::Conflict(-1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(i64);

impl ResultCode {
    /// One record affected.
    pub const APPLIED: Self = Self(1);
    /// Target record absent.
    pub const NOT_FOUND: Self = Self(0);
    /// Key or unique index collision.
    pub const CONFLICT: Self = Self(-1);

    /// Wrap a raw store count.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw value, echoed to clients on not-found and conflict responses.
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Classify the code by its sign.
    pub const fn outcome(self) -> Outcome {
        if self.0 > 0 {
            Outcome::Applied(self.0)
        } else if self.0 == 0 {
            Outcome::NotFound
        } else {
            Outcome::Conflict(self.0)
        }
    }
}

impl From<i64> for ResultCode {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Business outcome of a mutation.
///
/// Not-found and conflict are expected results, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Records were written; carries the affected count.
    Applied(i64),
    /// No record matched the key.
    NotFound,
    /// A key or unique index collided; carries the raw code.
    Conflict(i64),
}
