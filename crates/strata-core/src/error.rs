//! Allocation error taxonomy.

use thiserror::Error;

/// Errors reported by allocators and the containers built on them.
///
/// Success is represented by `Ok(..)`; there is no "none" variant.
/// Programmer errors (out-of-bounds indices, zero map capacity) are not
/// part of this taxonomy and panic instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum AllocationError {
    /// The allocator (or the operating system) could not satisfy the request.
    #[error("out of memory")]
    OutOfMemory,
    /// A size, alignment or key argument was rejected.
    #[error("invalid argument")]
    InvalidArgument,
    /// An address passed to a virtual-memory operation is not part of a
    /// live reservation.
    #[error("invalid pointer")]
    InvalidPointer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase_and_terse() {
        assert_eq!(AllocationError::OutOfMemory.to_string(), "out of memory");
        assert_eq!(AllocationError::InvalidArgument.to_string(), "invalid argument");
        assert_eq!(AllocationError::InvalidPointer.to_string(), "invalid pointer");
    }
}
