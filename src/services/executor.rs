//! Strategy executor.
//!
//! Runs one strategy's steps against a page and measures the yield. Every
//! failure is folded into the returned [`ExecutionResult`]; nothing here
//! returns `Err`.

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::PageError;
use crate::models::{Action, ExecutionResult, Strategy, StrategyFailure};
use crate::page::{ImagePredicate, PageContext};
use crate::services::CancelToken;

/// Executes strategies under a per-strategy time ceiling.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    predicate: ImagePredicate,
    timeout: Duration,
}

enum Bounded<T> {
    Done(T),
    TimedOut,
}

impl StrategyExecutor {
    pub fn new(predicate: ImagePredicate, timeout: Duration) -> Self {
        Self { predicate, timeout }
    }

    pub fn predicate(&self) -> &ImagePredicate {
        &self.predicate
    }

    /// Run `fut` within whatever is left of the time budget.
    async fn bounded<T>(&self, started: Instant, fut: impl Future<Output = T>) -> Bounded<T> {
        let Some(remaining) = self.timeout.checked_sub(started.elapsed()) else {
            return Bounded::TimedOut;
        };
        match tokio::time::timeout(remaining, fut).await {
            Ok(value) => Bounded::Done(value),
            Err(_) => Bounded::TimedOut,
        }
    }

    /// Find and click; `Ok(false)` when the element is absent.
    async fn click(
        page: &mut dyn PageContext,
        selector: &str,
        index: usize,
    ) -> Result<bool, PageError> {
        match page.find_nth(selector, index).await? {
            Some(element) => {
                page.click(&element).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Execute `strategy` against `page`.
    pub async fn execute(
        &self,
        strategy: &Strategy,
        page: &mut dyn PageContext,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let started = Instant::now();
        let mut sequence = Vec::new();
        // Selectors whose current `click_each` run has come up empty.
        // A click at index 0 starts a new run and clears the mark.
        let mut exhausted: HashSet<&str> = HashSet::new();

        log::debug!("Executing strategy {}", strategy.name);

        let timed_out = |sequence: Vec<String>| {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            log::warn!(
                "Strategy {} aborted after {}ms",
                strategy.name,
                elapsed_ms
            );
            ExecutionResult::failed(
                &strategy.name,
                sequence,
                StrategyFailure::TimedOut { elapsed_ms },
            )
        };

        for action in strategy.steps() {
            if cancel.is_cancelled() {
                log::info!("Strategy {} cancelled", strategy.name);
                return ExecutionResult::failed(&strategy.name, sequence, StrategyFailure::Cancelled);
            }

            match action {
                Action::Wait(ms) => {
                    let waited = self
                        .bounded(started, page.wait(Duration::from_millis(ms)))
                        .await;
                    match waited {
                        Bounded::TimedOut => return timed_out(sequence),
                        Bounded::Done(Err(PageError::Unreachable(msg))) => {
                            return ExecutionResult::failed(
                                &strategy.name,
                                sequence,
                                StrategyFailure::PageUnreachable(msg),
                            );
                        }
                        Bounded::Done(Err(e)) => {
                            log::debug!("Step skipped, {}: {}", e, action);
                            sequence.push(format!("{action} (skipped: {e})"));
                        }
                        Bounded::Done(Ok(())) => sequence.push(action.to_string()),
                    }
                }
                Action::Click { selector, index } => {
                    if index == 0 {
                        exhausted.remove(selector);
                    } else if exhausted.contains(selector) {
                        continue;
                    }
                    let clicked = self
                        .bounded(started, Self::click(page, selector, index))
                        .await;
                    match clicked {
                        Bounded::TimedOut => return timed_out(sequence),
                        Bounded::Done(Ok(true)) => sequence.push(action.to_string()),
                        Bounded::Done(Ok(false)) => {
                            exhausted.insert(selector);
                            log::debug!("Step skipped, not found: {}", action);
                            sequence.push(format!("{action} (skipped: not found)"));
                        }
                        Bounded::Done(Err(PageError::Unreachable(msg))) => {
                            log::warn!("Strategy {}: page unreachable: {}", strategy.name, msg);
                            return ExecutionResult::failed(
                                &strategy.name,
                                sequence,
                                StrategyFailure::PageUnreachable(msg),
                            );
                        }
                        Bounded::Done(Err(e)) => {
                            log::debug!("Step skipped, {}: {}", e, action);
                            sequence.push(format!("{action} (skipped: {e})"));
                        }
                    }
                }
            }
        }

        let counted = self
            .bounded(started, page.count_matching(&self.predicate))
            .await;
        match counted {
            Bounded::TimedOut => timed_out(sequence),
            Bounded::Done(Ok(image_count)) => {
                log::debug!(
                    "Strategy {} found {} qualifying images",
                    strategy.name,
                    image_count
                );
                ExecutionResult {
                    strategy_name: strategy.name.clone(),
                    image_count,
                    action_sequence: sequence,
                    failure: None,
                }
            }
            Bounded::Done(Err(e)) => {
                log::warn!("Strategy {}: counting failed: {}", strategy.name, e);
                let message = match e {
                    PageError::Unreachable(msg) => msg,
                    other => other.to_string(),
                };
                ExecutionResult::failed(
                    &strategy.name,
                    sequence,
                    StrategyFailure::PageUnreachable(message),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Step;
    use crate::page::ElementHandle;
    use async_trait::async_trait;

    /// Page with a fixed set of clickable selectors and `per_selector`
    /// elements for each.
    struct FakePage {
        present: Vec<&'static str>,
        per_selector: usize,
        clicks: usize,
        clicked: Vec<usize>,
        finds: usize,
        images: usize,
        broken_wait: bool,
    }

    impl FakePage {
        fn new(present: Vec<&'static str>, per_selector: usize) -> Self {
            Self {
                present,
                per_selector,
                clicks: 0,
                clicked: Vec::new(),
                finds: 0,
                images: 0,
                broken_wait: false,
            }
        }
    }

    #[async_trait]
    impl PageContext for FakePage {
        async fn find_nth(
            &mut self,
            selector: &str,
            index: usize,
        ) -> Result<Option<ElementHandle>, PageError> {
            self.finds += 1;
            if selector == "!!" {
                return Err(PageError::InvalidSelector(selector.into()));
            }
            let found = self.present.contains(&selector) && index < self.per_selector;
            Ok(found.then(|| ElementHandle::new(selector, index)))
        }

        async fn click(&mut self, element: &ElementHandle) -> Result<(), PageError> {
            self.clicks += 1;
            self.clicked.push(element.index);
            self.images += 1;
            Ok(())
        }

        async fn wait(&mut self, duration: Duration) -> Result<(), PageError> {
            if self.broken_wait {
                return Err(PageError::script("timer unavailable"));
            }
            tokio::time::sleep(duration).await;
            Ok(())
        }

        async fn count_matching(&mut self, _predicate: &ImagePredicate) -> Result<usize, PageError> {
            Ok(self.images)
        }
    }

    fn executor(timeout: Duration) -> StrategyExecutor {
        StrategyExecutor::new(ImagePredicate::from_pattern(".").unwrap(), timeout)
    }

    #[tokio::test]
    async fn test_missing_element_is_skipped() {
        let strategy = Strategy::new(
            "s",
            vec![Step::click(".gone"), Step::click(".next"), Step::click("!!")],
        );
        let mut page = FakePage::new(vec![".next"], 1);
        let result = executor(Duration::from_secs(5))
            .execute(&strategy, &mut page, &CancelToken::new())
            .await;

        assert_eq!(result.failure, None);
        assert_eq!(result.image_count, 1);
        assert_eq!(result.action_sequence.len(), 3);
        assert_eq!(result.action_sequence[0], "click .gone (skipped: not found)");
        assert_eq!(result.action_sequence[1], "click .next");
        assert!(result.action_sequence[2].starts_with("click !! (skipped:"));
    }

    #[tokio::test]
    async fn test_click_each_stops_probing_after_last_element() {
        let strategy = Strategy::new("s", vec![Step::click_each(".thumb", 10)]);
        let mut page = FakePage::new(vec![".thumb"], 3);
        let result = executor(Duration::from_secs(5))
            .execute(&strategy, &mut page, &CancelToken::new())
            .await;

        assert_eq!(page.clicks, 3);
        assert_eq!(page.finds, 4);
        assert_eq!(result.image_count, 3);
        assert_eq!(result.action_sequence.len(), 4);
        assert!(result.action_sequence[3].ends_with("(skipped: not found)"));
    }

    #[tokio::test]
    async fn test_long_wait_times_out() {
        let strategy = Strategy::new("s", vec![Step::click(".next"), Step::wait(10_000)]);
        let mut page = FakePage::new(vec![".next"], 1);
        let result = executor(Duration::from_millis(50))
            .execute(&strategy, &mut page, &CancelToken::new())
            .await;

        assert_eq!(result.image_count, 0);
        assert!(matches!(result.failure, Some(StrategyFailure::TimedOut { .. })));
        assert_eq!(result.action_sequence, vec!["click .next"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_step() {
        let strategy = Strategy::new("s", vec![Step::click(".next")]);
        let mut page = FakePage::new(vec![".next"], 1);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = executor(Duration::from_secs(5))
            .execute(&strategy, &mut page, &cancel)
            .await;

        assert_eq!(result.failure, Some(StrategyFailure::Cancelled));
        assert_eq!(page.clicks, 0);
    }

    #[tokio::test]
    async fn test_repeated_click_each_clicks_every_pass() {
        let strategy = Strategy::new(
            "s",
            vec![Step::repeat(2, vec![Step::click_each(".thumb", 10)])],
        );
        let mut page = FakePage::new(vec![".thumb"], 3);
        let result = executor(Duration::from_secs(5))
            .execute(&strategy, &mut page, &CancelToken::new())
            .await;

        assert_eq!(page.clicked, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(result.action_sequence.len(), 8);
        assert_eq!(result.action_sequence[5], "click .thumb[1]");
        assert_eq!(result.action_sequence[7], "click .thumb[3] (skipped: not found)");
    }

    #[tokio::test]
    async fn test_failed_wait_is_marked_skipped() {
        let strategy = Strategy::new("s", vec![Step::wait(5), Step::click(".next")]);
        let mut page = FakePage::new(vec![".next"], 1);
        page.broken_wait = true;
        let result = executor(Duration::from_secs(5))
            .execute(&strategy, &mut page, &CancelToken::new())
            .await;

        assert_eq!(result.failure, None);
        assert!(result.action_sequence[0].starts_with("wait 5ms (skipped:"));
        assert_eq!(result.action_sequence[1], "click .next");
    }

    #[tokio::test]
    async fn test_hollow_repeat_does_not_block() {
        let strategy = Strategy::new(
            "s",
            vec![Step::repeat(400_000_000, vec![]), Step::click(".next")],
        );
        let mut page = FakePage::new(vec![".next"], 1);
        let started = Instant::now();
        let result = executor(Duration::from_millis(50))
            .execute(&strategy, &mut page, &CancelToken::new())
            .await;

        assert_eq!(result.failure, None);
        assert_eq!(result.action_sequence, vec!["click .next"]);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
