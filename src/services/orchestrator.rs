//! Strategy selection.
//!
//! One run walks `Init -> TryPreferred -> TryRemaining -> Done`:
//!
//! - **Init**: look up the domain's last successful strategy.
//! - **TryPreferred**: run it first, if it is still registered.
//! - **TryRemaining**: run every other strategy in registry order.
//! - **Done**: record a success when anything was found, otherwise exactly
//!   one failure, and report the best result.
//!
//! Any strategy reaching the success threshold ends the run early. A later
//! strategy only replaces the best result with a strictly higher yield, so
//! registry order decides ties.
//!
//! Strategies share the live page and are never run concurrently or
//! reordered beyond moving the preferred one to the front.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{Config, ExecutionResult, ExtractionReport, Strategy};
use crate::page::{ImagePredicate, PageContext};
use crate::services::{CancelToken, StrategyExecutor, StrategyRegistry};
use crate::storage::PatternStore;

/// Chooses and runs strategies for a domain, learning from each run.
pub struct Orchestrator {
    registry: Arc<StrategyRegistry>,
    executor: StrategyExecutor,
    store: Arc<PatternStore>,
    success_threshold: usize,
}

/// Best-so-far bookkeeping for one run.
#[derive(Default)]
struct RunState {
    best: Option<ExecutionResult>,
    attempts: Vec<String>,
}

impl RunState {
    /// Fold a result in. Returns whether it met the threshold.
    fn consider(&mut self, result: ExecutionResult, threshold: usize) -> bool {
        let reached = result.image_count >= threshold;
        log::info!("Tried {}", result.describe());
        self.attempts.push(result.describe());

        let better = match &self.best {
            None => true,
            Some(best) => result.image_count > best.image_count,
        };
        if better {
            self.best = Some(result);
        }
        reached
    }
}

impl Orchestrator {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        executor: StrategyExecutor,
        store: Arc<PatternStore>,
        success_threshold: usize,
    ) -> Self {
        Self {
            registry,
            executor,
            store,
            success_threshold,
        }
    }

    /// Wire an orchestrator from configuration.
    pub fn from_config(config: &Config, store: Arc<PatternStore>) -> Result<Self> {
        let registry = StrategyRegistry::from_config(config)?;
        let predicate = ImagePredicate::new(config.extraction.qualifying_regex()?);
        let executor = StrategyExecutor::new(
            predicate,
            Duration::from_millis(config.extraction.strategy_timeout_ms),
        );
        Ok(Self::new(
            Arc::new(registry),
            executor,
            store,
            config.extraction.success_threshold,
        ))
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Resolve the remembered strategy against the current registry.
    async fn preferred(&self, domain: &str) -> Result<Option<&Strategy>> {
        let Some(name) = self.store.get_best_strategy(domain).await? else {
            return Ok(None);
        };
        match self.registry.get(&name) {
            Some(strategy) => Ok(Some(strategy)),
            None => {
                log::warn!(
                    "Remembered strategy '{}' for {} is no longer registered",
                    name,
                    domain
                );
                Ok(None)
            }
        }
    }

    /// Run strategies against `page` and record the outcome for `domain`.
    ///
    /// Per-strategy failures never surface as `Err`; only pattern store
    /// failures do.
    pub async fn extract_with_strategy(
        &self,
        domain: &str,
        page: &mut dyn PageContext,
        cancel: &CancelToken,
    ) -> Result<ExtractionReport> {
        let threshold = self.success_threshold;
        let preferred = self.preferred(domain).await?;
        let mut state = RunState::default();
        let mut finished = false;

        if let Some(strategy) = preferred {
            log::info!("Trying remembered strategy {} for {}", strategy.name, domain);
            let result = self.executor.execute(strategy, page, cancel).await;
            finished = state.consider(result, threshold);
        }

        if !finished {
            for strategy in self.registry.iter() {
                if preferred.is_some_and(|p| p.name == strategy.name) {
                    continue;
                }
                if cancel.is_cancelled() {
                    log::info!("Extraction for {} cancelled", domain);
                    break;
                }
                let result = self.executor.execute(strategy, page, cancel).await;
                if state.consider(result, threshold) {
                    break;
                }
            }
        }

        match state.best {
            Some(best) if best.image_count > 0 => {
                log::info!(
                    "{}: {} found {} images",
                    domain,
                    best.strategy_name,
                    best.image_count
                );
                self.store
                    .record_success(domain, &best.strategy_name, best.image_count)
                    .await?;
                Ok(best.into())
            }
            best => {
                let reason = if state.attempts.is_empty() {
                    "no strategy ran".to_string()
                } else {
                    format!("all strategies failed: {}", state.attempts.join("; "))
                };
                log::warn!("{}: {}", domain, reason);
                self.store.record_failure(domain, &reason).await?;
                Ok(best.map(ExtractionReport::from).unwrap_or_else(ExtractionReport::empty))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, image_count: usize) -> ExecutionResult {
        ExecutionResult {
            strategy_name: name.into(),
            image_count,
            action_sequence: vec![],
            failure: None,
        }
    }

    #[test]
    fn test_first_result_becomes_best_even_at_zero() {
        let mut state = RunState::default();
        assert!(!state.consider(result("a", 0), 20));
        assert_eq!(state.best.unwrap().strategy_name, "a");
    }

    #[test]
    fn test_ties_keep_earlier() {
        let mut state = RunState::default();
        state.consider(result("a", 5), 20);
        state.consider(result("b", 5), 20);
        assert_eq!(state.best.as_ref().unwrap().strategy_name, "a");
        state.consider(result("c", 6), 20);
        assert_eq!(state.best.as_ref().unwrap().strategy_name, "c");
        assert_eq!(state.attempts.len(), 3);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut state = RunState::default();
        assert!(state.consider(result("a", 20), 20));
    }
}
