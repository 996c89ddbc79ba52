use thiserror::Error;

/// Errors returned by the `try_` family of lookups and removals.
///
/// Both variants are locally avoidable: every fallible operation also has an `Option`-returning
/// form, and [`WithDefault`] turns a missing key into a caller-supplied value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum Error {
    /// The key has no current occurrences.
    #[error("key not found")]
    KeyNotFound,

    /// An entry was requested from a multi-map with no entries.
    #[error("multi-map is empty")]
    Empty,
}

/// Replaces a [`Error::KeyNotFound`] result with a fallback value.
///
/// Other errors are passed through unchanged, so a default can never mask
/// [`Error::Empty`].
///
/// # Examples
///
/// ```
/// use multicollections::{MultiDict, WithDefault};
///
/// let mut map = MultiDict::from([("a", 1)]);
/// assert_eq!(map.try_get_one("b").with_default(&0), Ok(&0));
/// assert_eq!(map.try_pop_one("b").with_default(-1), Ok(-1));
/// assert_eq!(map.len(), 1);
/// ```
pub trait WithDefault<T> {
    /// Returns `Ok(default)` if the key was not found.
    ///
    /// # Errors
    ///
    /// Propagates every error other than [`Error::KeyNotFound`].
    fn with_default(self, default: T) -> Result<T, Error>;

    /// Returns `Ok(f())` if the key was not found, calling `f` only in that case.
    ///
    /// # Errors
    ///
    /// Propagates every error other than [`Error::KeyNotFound`].
    fn with_default_else<F: FnOnce() -> T>(self, f: F) -> Result<T, Error>;
}

impl<T> WithDefault<T> for Result<T, Error> {
    fn with_default(self, default: T) -> Result<T, Error> {
        match self {
            Err(Error::KeyNotFound) => Ok(default),
            other => other,
        }
    }

    fn with_default_else<F: FnOnce() -> T>(self, f: F) -> Result<T, Error> {
        match self {
            Err(Error::KeyNotFound) => Ok(f()),
            other => other,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn default_only_replaces_missing_keys() {
        assert_eq!(Ok::<_, Error>(1).with_default(2), Ok(1));
        assert_eq!(Err(Error::KeyNotFound).with_default(2), Ok(2));
        assert_eq!(Err::<i32, _>(Error::Empty).with_default(2), Err(Error::Empty));
    }

    #[test]
    fn default_else_is_lazy() {
        let result: Result<i32, Error> = Ok(1);
        assert_eq!(result.with_default_else(|| unreachable!()), Ok(1));
        assert_eq!(Err(Error::KeyNotFound).with_default_else(|| 7), Ok(7));
    }

    #[test]
    fn display() {
        assert_eq!(Error::KeyNotFound.to_string(), "key not found");
        assert_eq!(Error::Empty.to_string(), "multi-map is empty");
    }
}
