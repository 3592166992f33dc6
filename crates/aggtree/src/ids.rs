//! Node id generation.
//!
//! Every [`AggregationNode`](crate::AggregationNode) needs an id, which is
//! both its key in the wire payload and the name other aggregations use to
//! reference it. Callers usually assign ids explicitly; when they don't, one
//! is drawn from an [`IdGenerator`].
//!
//! The generator is injectable so that trees built in tests or on parallel
//! threads do not have to share hidden state. The process-wide default
//! ([`default_ids`]) keeps the "auto id if unset" behavior for everyone else.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh node ids.
pub trait IdGenerator: Send + Sync {
    /// Returns an id that this generator has never returned before.
    fn next_id(&self) -> String;
}

/// Monotonic counter producing `<prefix><n>` ids.
///
/// ```rust
/// use aggtree::{IdGenerator, SequentialIds};
///
/// let ids = SequentialIds::with_prefix("test_");
/// assert_eq!(ids.next_id(), "test_0");
/// assert_eq!(ids.next_id(), "test_1");
/// ```
#[derive(Debug)]
pub struct SequentialIds {
    prefix: &'static str,
    next: AtomicU64,
}

impl SequentialIds {
    /// Prefix used by the process-wide default generator.
    pub const DEFAULT_PREFIX: &'static str = "agg_";

    /// Creates a counter starting at zero with the default `agg_` prefix.
    pub const fn new() -> Self {
        Self::with_prefix(Self::DEFAULT_PREFIX)
    }

    /// Creates a counter starting at zero with a custom prefix.
    pub const fn with_prefix(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

static DEFAULT_IDS: SequentialIds = SequentialIds::new();

/// Returns the process-wide generator used when no generator is supplied.
///
/// It is never reset, so ids are unique within a process but not stable
/// across restarts.
pub fn default_ids() -> &'static dyn IdGenerator {
    &DEFAULT_IDS
}
