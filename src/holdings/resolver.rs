//! Constituent resolver: cache, fetch, normalize
//!
//! Orchestrates the per-fund chain `cache -> fetch -> normalize` with the
//! graceful-degradation contract: a fresh cache entry short-circuits the
//! fetch, a failed fetch falls back to whatever cached copy exists (marked
//! stale), and a fund only comes back `Unresolved` when fetch and cache
//! are both unavailable or the data defeats the normalizer. One bad fund
//! never aborts the rest of the portfolio.

use std::collections::HashMap;

use chrono::Duration;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::cache::HoldingCache;
use super::schema::{self, NormalizationReport};
use super::source::HoldingsSource;
use crate::types::Constituent;

/// Concurrent fund resolutions. Fund references are deduplicated before
/// resolution, so the same fund is never fetched twice in one run.
const CONCURRENT_RESOLUTIONS: usize = 4;

/// Outcome of resolving one fund reference.
#[derive(Debug, Clone)]
pub enum ResolutionResult {
    Resolved {
        constituents: Vec<Constituent>,
        report: NormalizationReport,
        /// True when the data came from a cache fallback after a failed
        /// fetch and may be out of date.
        stale: bool,
    },
    Unresolved {
        reason: String,
    },
}

impl ResolutionResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved { .. })
    }
}

pub struct ConstituentResolver<S: HoldingsSource> {
    source: S,
    cache: HoldingCache,
    max_age: Duration,
}

impl<S: HoldingsSource> ConstituentResolver<S> {
    pub fn new(source: S, cache: HoldingCache, max_age: Duration) -> Self {
        Self {
            source,
            cache,
            max_age,
        }
    }

    pub fn cache(&self) -> &HoldingCache {
        &self.cache
    }

    /// Resolve one fund reference into normalized constituents.
    pub async fn resolve(&self, reference: &str, force_refresh: bool) -> ResolutionResult {
        // Fresh cache hit: normalize and return without touching the
        // network. A cached blob the normalizer rejects is treated like a
        // miss so a re-fetch gets the chance to replace it.
        if !force_refresh && !self.cache.is_stale(reference, self.max_age) {
            if let Ok(Some(cached)) = self.cache.get(reference) {
                match schema::normalize(&cached.raw) {
                    Ok((constituents, report)) => {
                        info!(reference, holdings = constituents.len(), "Resolved from cache");
                        return ResolutionResult::Resolved {
                            constituents,
                            report,
                            stale: false,
                        };
                    }
                    Err(err) => {
                        warn!(reference, %err, "Cached table failed normalization, re-fetching");
                    }
                }
            }
        }

        match self.source.fetch_raw(reference).await {
            Ok(raw) => {
                if let Err(err) = self.cache.put(reference, &raw) {
                    warn!(reference, %err, "Failed to cache fetched holdings");
                }
                match schema::normalize(&raw) {
                    Ok((constituents, report)) => {
                        info!(
                            reference,
                            holdings = constituents.len(),
                            source = self.source.name(),
                            "Resolved from fetch"
                        );
                        ResolutionResult::Resolved {
                            constituents,
                            report,
                            stale: false,
                        }
                    }
                    Err(err) => ResolutionResult::Unresolved {
                        reason: err.to_string(),
                    },
                }
            }
            Err(fetch_err) => {
                // Fetch failed: fall back to any cached copy, however old.
                if let Ok(Some(cached)) = self.cache.get(reference) {
                    if let Ok((constituents, report)) = schema::normalize(&cached.raw) {
                        warn!(
                            reference,
                            fetched_at = %cached.fetched_at,
                            %fetch_err,
                            "Fetch failed, using stale cached holdings"
                        );
                        return ResolutionResult::Resolved {
                            constituents,
                            report,
                            stale: true,
                        };
                    }
                }
                warn!(reference, %fetch_err, "Fund could not be resolved");
                ResolutionResult::Unresolved {
                    reason: fetch_err.to_string(),
                }
            }
        }
    }

    /// Resolve the unique fund references of a portfolio concurrently.
    /// Duplicates collapse to a single resolution, which also bounds the
    /// network work to one in-flight fetch per fund.
    pub async fn resolve_many(
        &self,
        references: &[String],
        force_refresh: bool,
    ) -> HashMap<String, ResolutionResult> {
        let mut unique: Vec<&String> = Vec::new();
        for reference in references {
            if !unique.contains(&reference) {
                unique.push(reference);
            }
        }

        stream::iter(unique)
            .map(|reference| async move {
                let result = self.resolve(reference, force_refresh).await;
                (reference.clone(), result)
            })
            .buffer_unordered(CONCURRENT_RESOLUTIONS)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const GOOD_TABLE: &[u8] = b"Name,Weight\nAlpha,60%\nBeta,40%\n";

    /// In-memory source used to script fetch outcomes.
    struct ScriptedSource {
        response: Result<Vec<u8>, ()>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn ok(raw: &[u8]) -> Self {
            Self {
                response: Ok(raw.to_vec()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HoldingsSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch_raw(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .map_err(|_| FetchError::LinkNotFound(reference.to_string()))
        }
    }

    fn resolver(dir: &TempDir, source: ScriptedSource) -> ConstituentResolver<ScriptedSource> {
        let cache = HoldingCache::new(dir.path()).unwrap();
        ConstituentResolver::new(source, cache, Duration::hours(24))
    }

    #[tokio::test]
    async fn test_fetch_then_cache_then_resolve() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, ScriptedSource::ok(GOOD_TABLE));

        let result = resolver.resolve("fund-a", false).await;
        match result {
            ResolutionResult::Resolved {
                constituents,
                stale,
                ..
            } => {
                assert_eq!(constituents.len(), 2);
                assert!(!stale);
            }
            other => panic!("expected resolved, got {:?}", other),
        }

        // The fetched blob landed in the cache.
        assert!(resolver.cache().get("fund-a").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, ScriptedSource::ok(GOOD_TABLE));
        resolver.cache().put("fund-a", GOOD_TABLE).unwrap();

        let result = resolver.resolve("fund-a", false).await;
        assert!(result.is_resolved());
        assert_eq!(resolver.source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, ScriptedSource::ok(GOOD_TABLE));
        resolver.cache().put("fund-a", GOOD_TABLE).unwrap();

        let result = resolver.resolve("fund-a", true).await;
        assert!(result.is_resolved());
        assert_eq!(resolver.source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_stale_cache() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, ScriptedSource::failing());
        resolver.cache().put("fund-a", GOOD_TABLE).unwrap();

        // Force refresh makes the failing fetch run first; the cached
        // copy still rescues the resolution, flagged stale.
        let result = resolver.resolve("fund-a", true).await;
        match result {
            ResolutionResult::Resolved { stale, .. } => assert!(stale),
            other => panic!("expected stale resolution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_without_cache_is_unresolved() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, ScriptedSource::failing());

        let result = resolver.resolve("fund-a", false).await;
        match result {
            ResolutionResult::Unresolved { reason } => {
                assert!(reason.contains("fund-a"));
            }
            other => panic!("expected unresolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schema_failure_on_fetched_data_is_unresolved() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, ScriptedSource::ok(b"no,recognizable\nheader,here\n"));

        let result = resolver.resolve("fund-a", false).await;
        match result {
            ResolutionResult::Unresolved { reason } => {
                assert!(reason.contains("header"));
            }
            other => panic!("expected unresolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_many_dedupes_references() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, ScriptedSource::ok(GOOD_TABLE));

        let refs = vec![
            "fund-a".to_string(),
            "fund-b".to_string(),
            "fund-a".to_string(),
        ];
        let results = resolver.resolve_many(&refs, false).await;

        assert_eq!(results.len(), 2);
        assert_eq!(resolver.source.call_count(), 2);
        assert!(results["fund-a"].is_resolved());
        assert!(results["fund-b"].is_resolved());
    }
}
