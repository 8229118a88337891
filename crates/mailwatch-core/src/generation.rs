//! Refresh pass numbering.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number of a refresh pass.
///
/// Every event produced on behalf of a pass carries its generation; a
/// consumer that has seen a newer pass drops anything older.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation in effect before the first pass.
    pub const INITIAL: Self = Self(0);

    /// Returns true if `self` was produced before `other`.
    #[must_use]
    pub fn is_older_than(self, other: Self) -> bool {
        self < other
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared view of the newest generation.
///
/// The monitor advances it; fetch tasks read it to notice they have been
/// superseded.
#[derive(Debug, Clone, Default)]
pub struct GenerationCursor(Arc<AtomicU64>);

impl GenerationCursor {
    /// Creates a cursor at [`Generation::INITIAL`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The newest generation.
    #[must_use]
    pub fn current(&self) -> Generation {
        Generation(self.0.load(Ordering::Acquire))
    }

    /// Starts a new generation and returns it.
    pub fn advance(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Returns true if nothing newer than `generation` has started.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        !generation.is_older_than(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic_and_shared() {
        let cursor = GenerationCursor::new();
        let view = cursor.clone();
        assert_eq!(view.current(), Generation::INITIAL);

        let first = cursor.advance();
        let second = cursor.advance();
        assert!(first.is_older_than(second));
        assert_eq!(view.current(), second);
        assert!(!view.is_current(first));
        assert!(view.is_current(second));
    }
}
