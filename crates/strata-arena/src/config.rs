//! Arena configuration parameters.

use strata_core::{align_up, MIB};
use thiserror::Error;

/// Reservations are rounded up to a multiple of this block size.
pub const RESERVE_BLOCK: usize = 64 * MIB;

/// Configuration for [`Arena`](crate::Arena) construction.
///
/// Validated at construction; all values are immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Requested address-space ceiling in bytes.
    ///
    /// Rounded up to a multiple of [`RESERVE_BLOCK`] (64 MiB). Must be
    /// non-zero.
    pub reserve_size: usize,

    /// Default alignment for every allocation. Default: 16.
    ///
    /// Individual requests with a stricter `Layout` alignment get the
    /// stricter one.
    pub align: usize,

    /// Commit/decommit rounding unit. `None` = the OS page size.
    ///
    /// Must be a power of two, at least the page size, and at most
    /// [`RESERVE_BLOCK`].
    pub commit_granularity: Option<usize>,
}

impl ArenaConfig {
    /// Default allocation alignment.
    pub const DEFAULT_ALIGN: usize = 16;

    /// Create a config for the given reservation size with default
    /// alignment and page-sized commit granularity.
    pub fn new(reserve_size: usize) -> Self {
        Self {
            reserve_size,
            align: Self::DEFAULT_ALIGN,
            commit_granularity: None,
        }
    }

    /// Override the default allocation alignment.
    pub fn with_align(mut self, align: usize) -> Self {
        self.align = align;
        self
    }

    /// Override the commit granularity.
    pub fn with_commit_granularity(mut self, granularity: usize) -> Self {
        self.commit_granularity = Some(granularity);
        self
    }

    /// Commit granularity after applying the page-size default.
    pub fn resolved_granularity(&self, page_size: usize) -> usize {
        self.commit_granularity.unwrap_or(page_size)
    }

    /// Reservation size after rounding up to [`RESERVE_BLOCK`].
    ///
    /// Returns `None` if rounding overflows.
    pub fn reserved_bytes(&self) -> Option<usize> {
        align_up(self.reserve_size, RESERVE_BLOCK)
    }

    /// Check structural invariants against the platform page size.
    pub fn validate(&self, page_size: usize) -> Result<(), ConfigError> {
        if self.reserve_size == 0 {
            return Err(ConfigError::ZeroReserve);
        }
        if self.reserved_bytes().is_none() {
            return Err(ConfigError::ReserveTooLarge {
                requested: self.reserve_size,
            });
        }
        if !self.align.is_power_of_two() {
            return Err(ConfigError::BadAlign { align: self.align });
        }
        let granularity = self.resolved_granularity(page_size);
        if !granularity.is_power_of_two()
            || granularity < page_size
            || granularity > RESERVE_BLOCK
        {
            return Err(ConfigError::BadGranularity {
                granularity,
                page_size,
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(RESERVE_BLOCK)
    }
}

/// Errors detected during [`ArenaConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `reserve_size` is zero.
    #[error("arena reserve size must be non-zero")]
    ZeroReserve,
    /// Rounding `reserve_size` up to the reservation block overflows.
    #[error("arena reserve size {requested} overflows when rounded to 64 MiB")]
    ReserveTooLarge {
        /// The configured size.
        requested: usize,
    },
    /// Alignment is not a power of two.
    #[error("arena alignment {align} is not a power of two")]
    BadAlign {
        /// The configured alignment.
        align: usize,
    },
    /// Commit granularity is not a power of two in `[page_size, 64 MiB]`.
    #[error("commit granularity {granularity} must be a power of two between the page size ({page_size}) and 64 MiB")]
    BadGranularity {
        /// The resolved granularity.
        granularity: usize,
        /// The platform page size.
        page_size: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    #[test]
    fn default_reserves_one_block() {
        let config = ArenaConfig::default();
        assert_eq!(config.reserved_bytes(), Some(64 * MIB));
        assert_eq!(config.align, 16);
        assert!(config.validate(PAGE).is_ok());
    }

    #[test]
    fn reserve_rounds_up_to_block() {
        assert_eq!(ArenaConfig::new(1).reserved_bytes(), Some(64 * MIB));
        assert_eq!(
            ArenaConfig::new(64 * MIB + 1).reserved_bytes(),
            Some(128 * MIB)
        );
    }

    #[test]
    fn zero_reserve_rejected() {
        assert_eq!(
            ArenaConfig::new(0).validate(PAGE),
            Err(ConfigError::ZeroReserve)
        );
    }

    #[test]
    fn overflowing_reserve_rejected() {
        assert!(matches!(
            ArenaConfig::new(usize::MAX).validate(PAGE),
            Err(ConfigError::ReserveTooLarge { .. })
        ));
    }

    #[test]
    fn non_power_of_two_align_rejected() {
        let config = ArenaConfig::default().with_align(24);
        assert_eq!(
            config.validate(PAGE),
            Err(ConfigError::BadAlign { align: 24 })
        );
    }

    #[test]
    fn granularity_bounds() {
        let small = ArenaConfig::default().with_commit_granularity(1024);
        assert!(matches!(
            small.validate(PAGE),
            Err(ConfigError::BadGranularity { .. })
        ));
        let huge = ArenaConfig::default().with_commit_granularity(128 * MIB);
        assert!(huge.validate(PAGE).is_err());
        let odd = ArenaConfig::default().with_commit_granularity(3 * PAGE);
        assert!(odd.validate(PAGE).is_err());
        let ok = ArenaConfig::default().with_commit_granularity(64 * 1024);
        assert!(ok.validate(PAGE).is_ok());
    }

    #[test]
    fn granularity_defaults_to_page_size() {
        assert_eq!(ArenaConfig::default().resolved_granularity(PAGE), PAGE);
    }
}
