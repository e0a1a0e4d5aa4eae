// src/models/outcome.rs

//! Results of running strategies against a page.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a strategy stopped before measuring its yield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyFailure {
    /// Navigation or page-context failure
    PageUnreachable(String),
    /// Cumulative time exceeded the per-strategy ceiling
    TimedOut { elapsed_ms: u64 },
    /// Caller cancelled the run
    Cancelled,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyFailure::PageUnreachable(msg) => write!(f, "page unreachable: {msg}"),
            StrategyFailure::TimedOut { elapsed_ms } => {
                write!(f, "timed out after {elapsed_ms}ms")
            }
            StrategyFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of executing one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub strategy_name: String,
    /// Distinct qualifying images found after the steps ran
    pub image_count: usize,
    /// Steps that fired, in order; skipped steps are marked
    pub action_sequence: Vec<String>,
    pub failure: Option<StrategyFailure>,
}

impl ExecutionResult {
    /// A result with zero yield caused by `failure`.
    pub fn failed(
        strategy_name: impl Into<String>,
        action_sequence: Vec<String>,
        failure: StrategyFailure,
    ) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            image_count: 0,
            action_sequence,
            failure: Some(failure),
        }
    }

    /// Short description used in failure history.
    pub fn describe(&self) -> String {
        match &self.failure {
            Some(failure) => format!("{}: {}", self.strategy_name, failure),
            None if self.image_count == 0 => {
                format!("{}: no qualifying images", self.strategy_name)
            }
            None => format!("{}: {} images", self.strategy_name, self.image_count),
        }
    }
}

/// Caller-facing result of a full extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub success: bool,
    pub strategy_used: Option<String>,
    pub image_count: usize,
    pub sequence: Vec<String>,
}

impl ExtractionReport {
    /// Report for a run where no strategy executed at all.
    pub fn empty() -> Self {
        Self {
            success: false,
            strategy_used: None,
            image_count: 0,
            sequence: Vec::new(),
        }
    }
}

impl From<ExecutionResult> for ExtractionReport {
    fn from(result: ExecutionResult) -> Self {
        let success = result.image_count > 0;
        Self {
            success,
            strategy_used: success.then_some(result.strategy_name),
            image_count: result.image_count,
            sequence: result.action_sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ExtractionReport {
            success: true,
            strategy_used: Some("thumbnails".into()),
            image_count: 7,
            sequence: vec!["click #thumbs a".into()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategyUsed"], "thumbnails");
        assert_eq!(json["imageCount"], 7);
    }

    #[test]
    fn test_zero_yield_report_has_no_strategy() {
        let result = ExecutionResult {
            strategy_name: "navigation".into(),
            image_count: 0,
            action_sequence: vec![],
            failure: None,
        };
        let report = ExtractionReport::from(result);
        assert!(!report.success);
        assert!(report.strategy_used.is_none());
    }

    #[test]
    fn test_describe_failure() {
        let result = ExecutionResult::failed(
            "arrow-main",
            vec![],
            StrategyFailure::PageUnreachable("tab closed".into()),
        );
        assert_eq!(result.describe(), "arrow-main: page unreachable: tab closed");
    }
}
