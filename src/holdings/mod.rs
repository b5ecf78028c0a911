//! Fund holdings: fetch, cache, normalize, resolve

pub mod cache;
pub mod resolver;
pub mod schema;
pub mod source;

pub use cache::{CacheEntry, CachedHoldings, HoldingCache};
pub use resolver::{ConstituentResolver, ResolutionResult};
pub use schema::{normalize, NormalizationReport};
pub use source::{HoldingsSource, IsharesSource, OfflineSource};
