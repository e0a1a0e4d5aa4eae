// src/models/record.rs

//! Per-domain extraction history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A strategy that produced qualifying images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessEntry {
    pub strategy_name: String,
    pub image_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// An extraction run that produced nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureEntry {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything remembered about one site domain.
///
/// `last_successful_strategy`, when set, always names an entry of
/// `success_history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainRecord {
    #[serde(default)]
    pub last_successful_strategy: Option<String>,

    #[serde(default)]
    pub success_history: Vec<SuccessEntry>,

    #[serde(default)]
    pub failure_history: Vec<FailureEntry>,
}

impl DomainRecord {
    /// Append a success and make it the preferred strategy.
    pub fn push_success(&mut self, strategy_name: &str, image_count: usize, max_history: usize) {
        self.success_history.push(SuccessEntry {
            strategy_name: strategy_name.to_string(),
            image_count,
            timestamp: Utc::now(),
        });
        self.last_successful_strategy = Some(strategy_name.to_string());
        trim_front(&mut self.success_history, max_history);
    }

    /// Append a failure. The preferred strategy is left untouched.
    pub fn push_failure(&mut self, reason: &str, max_history: usize) {
        self.failure_history.push(FailureEntry {
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        trim_front(&mut self.failure_history, max_history);
    }

    /// Most recent success, if any.
    pub fn latest_success(&self) -> Option<&SuccessEntry> {
        self.success_history.last()
    }

    /// Most recent failure, if any.
    pub fn latest_failure(&self) -> Option<&FailureEntry> {
        self.failure_history.last()
    }

    /// Check the preferred-strategy invariant.
    pub fn is_consistent(&self) -> bool {
        match &self.last_successful_strategy {
            None => true,
            Some(name) => self
                .success_history
                .iter()
                .any(|e| &e.strategy_name == name),
        }
    }
}

/// Keep only the newest `max` entries. A zero cap is treated as one so the
/// newest entry always survives.
fn trim_front<T>(entries: &mut Vec<T>, max: usize) {
    let max = max.max(1);
    if entries.len() > max {
        let excess = entries.len() - max;
        entries.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_success_sets_preferred() {
        let mut record = DomainRecord::default();
        record.push_success("thumbnails", 12, 10);
        assert_eq!(
            record.last_successful_strategy.as_deref(),
            Some("thumbnails")
        );
        assert_eq!(record.latest_success().unwrap().image_count, 12);
        assert!(record.is_consistent());
    }

    #[test]
    fn test_push_failure_keeps_preferred() {
        let mut record = DomainRecord::default();
        record.push_success("arrow-main", 30, 10);
        record.push_failure("no qualifying images", 10);
        record.push_failure("no qualifying images", 10);
        assert_eq!(
            record.last_successful_strategy.as_deref(),
            Some("arrow-main")
        );
        assert_eq!(record.failure_history.len(), 2);
    }

    #[test]
    fn test_history_is_capped() {
        let mut record = DomainRecord::default();
        for i in 0..8 {
            record.push_success(&format!("s{i}"), i, 3);
            record.push_failure(&format!("f{i}"), 3);
        }
        assert_eq!(record.success_history.len(), 3);
        assert_eq!(record.failure_history.len(), 3);
        assert_eq!(record.success_history[0].strategy_name, "s5");
        assert_eq!(record.latest_failure().unwrap().reason, "f7");
        assert!(record.is_consistent());
    }

    #[test]
    fn test_zero_cap_keeps_newest() {
        let mut record = DomainRecord::default();
        record.push_success("a", 1, 0);
        record.push_success("b", 2, 0);
        assert_eq!(record.success_history.len(), 1);
        assert!(record.is_consistent());
    }
}
