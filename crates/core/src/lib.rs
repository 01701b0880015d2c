pub mod config;
pub mod detection;
pub mod error;
pub mod rule;
pub mod store;

pub use config::Config;
pub use detection::*;
pub use error::*;
pub use rule::*;
pub use store::{DirectoryRuleStore, MemoryRuleStore, RuleStore};
