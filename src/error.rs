//! Error types for the spillcache library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Returned by [`SpillCache`](crate::cache::SpillCache)
//!   operations. Either the key was rejected before any state was touched, or
//!   the delegate store failed and its error is passed through unchanged.
//! - [`ConfigError`]: Returned when construction parameters are invalid
//!   (e.g. zero capacity, zero shards).
//! - [`InvariantError`]: Returned by the debug-oriented `check_invariants`
//!   methods when occupancy or residency bookkeeping is inconsistent.
//!
//! Running out of buffer capacity is *not* an error: new keys are routed to
//! the delegate store instead.
//!
//! ## Example Usage
//!
//! ```
//! use spillcache::error::ConfigError;
//! use spillcache::cache::SpillCache;
//! use spillcache::store::hashmap::ShardedHashMapStore;
//!
//! let delegate: ShardedHashMapStore<u64, u64> = ShardedHashMapStore::new(4);
//! let bad = SpillCache::try_new(delegate, 0, ShardedHashMapStore::new(4));
//! assert!(matches!(bad, Err(ConfigError { .. })));
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error returned by cache operations.
///
/// `E` is the delegate store's error type. Buffer-side operations are
/// in-memory and cannot fail, so every runtime failure originates either in
/// key validation or in the delegate.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The key was rejected by the configured key filter. No state changed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The delegate store failed. The error is passed through verbatim.
    #[error("delegate store failure: {0}")]
    Delegate(#[source] E),
}

impl<E> CacheError<E> {
    /// Returns `true` if this is a key validation failure.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns the delegate error, if any.
    pub fn delegate_error(&self) -> Option<&E> {
        match self {
            Self::Delegate(e) => Some(e),
            Self::InvalidArgument(_) => None,
        }
    }

    /// Consumes the error and returns the delegate error, if any.
    pub fn into_delegate_error(self) -> Option<E> {
        match self {
            Self::Delegate(e) => Some(e),
            Self::InvalidArgument(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by [`SpillCache::check_invariants`](crate::cache::SpillCache::check_invariants).
/// Only meaningful at quiescent points (no in-flight `put`/`remove`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvariantError {
    message: String,
}

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`SpillCache::try_new`](crate::cache::SpillCache::try_new) and
/// [`SpillCacheBuilder::try_build`](crate::builder::SpillCacheBuilder::try_build).
///
/// # Example
///
/// ```
/// use spillcache::builder::SpillCacheBuilder;
/// use spillcache::store::hashmap::ConcurrentHashMapStore;
///
/// let delegate: ConcurrentHashMapStore<u64, u64> = ConcurrentHashMapStore::new();
/// let err = SpillCacheBuilder::new(0).try_build(delegate).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    // -- CacheError -------------------------------------------------------

    #[test]
    fn cache_error_invalid_argument_display() {
        let err: CacheError<io::Error> = CacheError::InvalidArgument("empty key".into());
        assert_eq!(err.to_string(), "invalid argument: empty key");
        assert!(err.is_invalid_argument());
        assert!(err.delegate_error().is_none());
    }

    #[test]
    fn cache_error_delegate_keeps_source() {
        let err = CacheError::Delegate(io::Error::new(io::ErrorKind::TimedOut, "slow disk"));
        assert!(!err.is_invalid_argument());
        assert_eq!(
            err.delegate_error().map(io::Error::kind),
            Some(io::ErrorKind::TimedOut)
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("slow disk"));
    }

    #[test]
    fn cache_error_into_delegate_error() {
        let err = CacheError::Delegate(io::Error::other("boom"));
        let inner = err.into_delegate_error().unwrap();
        assert_eq!(inner.to_string(), "boom");
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("occupancy mismatch");
        assert_eq!(err.to_string(), "occupancy mismatch");
        assert_eq!(err.message(), "occupancy mismatch");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("capacity must be > 0");
        assert_eq!(err.to_string(), "capacity must be > 0");
        assert_eq!(err.message(), "capacity must be > 0");
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
        assert_error::<InvariantError>();
        assert_error::<CacheError<io::Error>>();
    }
}
