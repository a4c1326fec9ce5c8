//! Arena construction errors.

use strata_core::AllocationError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while creating an [`Arena`](crate::Arena).
///
/// Allocation from a live arena reports [`AllocationError`] directly.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Reserving the region or committing the header granule failed.
    #[error("arena setup failed: {0}")]
    Allocation(#[from] AllocationError),
}

impl ArenaError {
    /// The allocation error class, if this is an OS-level failure.
    pub fn allocation(&self) -> Option<AllocationError> {
        match self {
            Self::Allocation(e) => Some(*e),
            Self::Config(_) => None,
        }
    }
}
