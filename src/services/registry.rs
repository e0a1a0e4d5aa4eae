//! Strategy catalogue.
//!
//! Registration order matters: the orchestrator tries strategies in this
//! order and uses it to break ties between equal yields.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{Config, Step, Strategy};

/// Fixed, ordered set of strategies. Immutable once built.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Strategy>,
}

impl StrategyRegistry {
    /// Build a registry, rejecting empty catalogues, malformed strategies
    /// and duplicate names.
    pub fn new(strategies: Vec<Strategy>) -> Result<Self> {
        if strategies.is_empty() {
            return Err(AppError::config("strategy registry is empty"));
        }
        let mut seen = HashSet::new();
        for strategy in &strategies {
            strategy.validate()?;
            if !seen.insert(strategy.name.as_str()) {
                return Err(AppError::config(format!(
                    "duplicate strategy name '{}'",
                    strategy.name
                )));
            }
        }
        Ok(Self { strategies })
    }

    /// Strategies from the config file, or the built-in set if none.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.strategies.is_empty() {
            Ok(Self::builtin())
        } else {
            Self::new(config.strategies.clone())
        }
    }

    /// Built-in strategies for classified-ad galleries.
    pub fn builtin() -> Self {
        Self {
            strategies: builtin_strategies(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name == name)
    }

    /// Strategies in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn builtin_strategies() -> Vec<Strategy> {
    vec![
        // Main gallery forward arrow, one image per click
        Strategy::new(
            "arrow-main",
            vec![Step::repeat(
                24,
                vec![
                    Step::click(".gallery .slider-forward-arrow, .gallery .arrow.forward"),
                    Step::wait(300),
                ],
            )],
        ),
        // Thumbnail strip; each thumbnail swaps in its full-size image
        Strategy::new(
            "thumbnails",
            vec![
                Step::click_each("#thumbs a, .gallery .thumb, .thumbs img", 40),
                Step::wait(500),
            ],
        ),
        // Generic carousel "next" controls
        Strategy::new(
            "navigation",
            vec![Step::repeat(
                24,
                vec![
                    Step::click(
                        ".swiper-button-next, .carousel-next, button[aria-label='Next'], [class*='next']",
                    ),
                    Step::wait(250),
                ],
            )],
        ),
        // Open the lightbox first, then walk it
        Strategy::new(
            "open-gallery",
            vec![
                Step::click(".gallery img, .swipe img, .main-image img"),
                Step::wait(800),
                Step::repeat(
                    24,
                    vec![
                        Step::click(".lightbox .next, .pswp__button--arrow--right"),
                        Step::wait(250),
                    ],
                ),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec!["arrow-main", "thumbnails", "navigation", "open-gallery"]
        );
    }

    #[test]
    fn test_get() {
        let registry = StrategyRegistry::builtin();
        assert!(registry.get("thumbnails").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = StrategyRegistry::new(vec![
            Strategy::new("a", vec![Step::wait(1)]),
            Strategy::new("a", vec![Step::wait(2)]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unbounded_repeat() {
        let result = StrategyRegistry::new(vec![Strategy::new(
            "spin",
            vec![Step::repeat(usize::MAX, vec![Step::wait(1)])],
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(StrategyRegistry::new(vec![]).is_err());
    }

    #[test]
    fn test_from_config_prefers_configured() {
        let mut config = Config::default();
        assert_eq!(StrategyRegistry::from_config(&config).unwrap().len(), 4);

        config
            .strategies
            .push(Strategy::new("only", vec![Step::click(".x")]));
        let registry = StrategyRegistry::from_config(&config).unwrap();
        assert_eq!(registry.names(), vec!["only"]);
    }
}
