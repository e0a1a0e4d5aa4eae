// src/pipeline/extract.rs

//! Single-page extraction pipeline.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Config, ExtractionReport};
use crate::page::PageContext;
use crate::services::{CancelToken, Orchestrator};
use crate::storage::PatternStore;
use crate::utils::get_domain;

/// Run every applicable strategy on `page` (opened at `url`) and remember the
/// outcome under the URL's domain.
pub async fn run_extract(
    config: &Config,
    store: Arc<PatternStore>,
    url: &str,
    page: &mut dyn PageContext,
    cancel: &CancelToken,
) -> Result<ExtractionReport> {
    let domain =
        get_domain(url).ok_or_else(|| AppError::validation(format!("no host in URL '{url}'")))?;

    let orchestrator = Orchestrator::from_config(config, store)?;
    log::info!(
        "Extracting {} with {} strategies (threshold {})",
        domain,
        orchestrator.registry().len(),
        config.extraction.success_threshold
    );

    let report = orchestrator
        .extract_with_strategy(&domain, page, cancel)
        .await?;

    if report.success {
        log::info!(
            "✓ {} images via {}",
            report.image_count,
            report.strategy_used.as_deref().unwrap_or("-")
        );
    } else {
        log::warn!("No qualifying images found on {}", url);
    }

    Ok(report)
}
