// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// How long a backend should keep a stored value.
///
/// Backends receive an `Expiry` on every write. A zero lifetime is never
/// represented: [`Expiry::after`] folds it into [`Expiry::Never`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Expiry {
    /// Keep the value until it is deleted or evicted.
    #[default]
    Never,
    /// Expire the value once the given duration has elapsed since the write.
    After(Duration),
}

impl Expiry {
    /// Creates an expiry for the given lifetime.
    ///
    /// A zero duration means "never expire".
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use doccache_backend::Expiry;
    ///
    /// assert_eq!(Expiry::after(Duration::ZERO), Expiry::Never);
    /// assert_eq!(Expiry::after(Duration::from_secs(5)), Expiry::After(Duration::from_secs(5)));
    /// ```
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        if duration.is_zero() { Self::Never } else { Self::After(duration) }
    }

    /// Returns the lifetime, or `None` for values that never expire.
    #[must_use]
    pub fn duration(self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::After(duration) => Some(duration),
        }
    }
}

impl From<Option<Duration>> for Expiry {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Self::Never, Self::after)
    }
}
