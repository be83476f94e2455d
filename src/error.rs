use std::any::Any;

use thiserror::Error;

/// Boxed error type returned by fallible weighers and eviction listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong when configuring or writing to a cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache can't be built (or resized) with the requested settings.
    #[error("invalid cache configuration: {0}")]
    InvalidConfiguration(String),

    /// A key or value was absent at the nullable entry point.
    #[error("cache keys and values must be present")]
    NullKeyOrValue,

    /// The weigher failed, panicked, or produced a weight of zero. Nothing
    /// was inserted.
    #[error("weigher failed: {0}")]
    WeigherFailure(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// The message a caught panic was raised with, if it carried one.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    use super::{panic_message, CacheError};

    #[test]
    fn test_error_messages() {
        assert_eq!(
            "invalid cache configuration: capacity must be positive",
            CacheError::InvalidConfiguration("capacity must be positive".to_owned()).to_string()
        );
        assert_eq!(
            "weigher failed: zero weight",
            CacheError::WeigherFailure("zero weight".to_owned()).to_string()
        );
    }

    #[test]
    fn test_panic_message() {
        let panic = catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!("static message", panic_message(&*panic));

        let panic = catch_unwind(|| panic!("formatted {}", 1)).unwrap_err();
        assert_eq!("formatted 1", panic_message(&*panic));
    }
}
