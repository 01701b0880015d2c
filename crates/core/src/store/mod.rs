//! Rule corpus stores.
//!
//! The similarity engine only needs read-only enumeration of a corpus. The
//! persistence technology behind a store is not its concern, so stores sit
//! behind the [`RuleStore`] trait.

mod directory;
mod memory;

pub use self::directory::DirectoryRuleStore;
pub use self::memory::MemoryRuleStore;

use crate::error::Result;
use crate::rule::StoredRule;

/// Read-only enumeration over a rule corpus.
pub trait RuleStore: Send + Sync {
    /// Human-readable store name for logs.
    fn name(&self) -> &str;

    /// Snapshot every rule in the store, in a stable order.
    ///
    /// Failure to reach the corpus is an error. An empty corpus is not.
    fn enumerate(&self) -> Result<Vec<StoredRule>>;
}
