//! Command implementations

pub mod analyze;
pub mod cache;
pub mod export;
pub mod fetch;
pub mod init;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use chrono::Duration;

use crate::config::{self, PortfolioLine};
use crate::data_paths::DataPaths;
use crate::holdings::{
    ConstituentResolver, HoldingCache, HoldingsSource, IsharesSource, OfflineSource,
    ResolutionResult,
};

/// Shared resolution knobs for analyze/fetch/export.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolveOptions {
    pub offline: bool,
    pub force_refresh: bool,
    pub max_age_hours: i64,
}

/// Build a resolver against the shared data directory. Offline runs swap
/// in the null source and accept cache entries of any age.
pub(crate) fn build_resolver(
    data_paths: &DataPaths,
    opts: ResolveOptions,
) -> Result<ConstituentResolver<Box<dyn HoldingsSource>>> {
    let cache = HoldingCache::new(data_paths.cache())?;
    let (source, max_age): (Box<dyn HoldingsSource>, Duration) = if opts.offline {
        (Box::new(OfflineSource), Duration::weeks(520))
    } else {
        (
            Box::new(IsharesSource::new()),
            Duration::hours(opts.max_age_hours),
        )
    };
    Ok(ConstituentResolver::new(source, cache, max_age))
}

/// Load the portfolio file and resolve all of its fund references.
pub(crate) async fn load_and_resolve(
    portfolio_path: &Path,
    data_paths: &DataPaths,
    opts: ResolveOptions,
) -> Result<(Vec<PortfolioLine>, HashMap<String, ResolutionResult>)> {
    let lines = config::load_portfolio(portfolio_path)?;
    let references: Vec<String> = lines
        .iter()
        .filter_map(|line| line.fund_reference().map(str::to_string))
        .collect();

    let resolver = build_resolver(data_paths, opts)?;
    let resolutions = resolver
        .resolve_many(&references, opts.force_refresh && !opts.offline)
        .await;

    Ok((lines, resolutions))
}
