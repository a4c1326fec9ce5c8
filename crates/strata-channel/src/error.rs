//! Channel error types.

use std::fmt;

use strata_core::AllocationError;
use thiserror::Error;

/// A send that did not enqueue; the item is handed back.
#[derive(Error)]
pub enum SendError<T> {
    /// The channel was closed before the item could be enqueued.
    #[error("sending on a closed channel")]
    Closed(T),
    /// Growing the queue failed.
    #[error("channel queue allocation failed: {error}")]
    Alloc {
        /// The rejected item.
        item: T,
        /// Why the queue could not grow.
        error: AllocationError,
    },
    /// A bounded channel is at capacity (only from
    /// [`try_send`](crate::Channel::try_send)).
    #[error("channel is full")]
    Full(T),
}

impl<T> SendError<T> {
    /// Recover the item that was not sent.
    pub fn into_inner(self) -> T {
        match self {
            Self::Closed(item) | Self::Full(item) | Self::Alloc { item, .. } => item,
        }
    }

    /// Whether the failure was caused by closure.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

// Items need not be Debug; show the variant only.
impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => f.write_str("Closed(..)"),
            Self::Alloc { error, .. } => f
                .debug_struct("Alloc")
                .field("error", error)
                .finish_non_exhaustive(),
            Self::Full(_) => f.write_str("Full(..)"),
        }
    }
}

impl<T> PartialEq for SendError<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Closed(a), Self::Closed(b)) | (Self::Full(a), Self::Full(b)) => a == b,
            (
                Self::Alloc { item: a, error: ea },
                Self::Alloc { item: b, error: eb },
            ) => a == b && ea == eb,
            _ => false,
        }
    }
}

/// Why [`try_receive`](crate::Channel::try_receive) returned nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TryReceiveError {
    /// The channel is open but holds no items.
    #[error("channel is empty")]
    Empty,
    /// The channel is closed and fully drained.
    #[error("channel is closed and drained")]
    Closed,
}
