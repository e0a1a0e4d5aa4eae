//! Live page contexts that strategies act on.
//!
//! A page context is stateful: clicking advances carousels and galleries, and
//! later strategies see the state earlier ones left behind. Strategies are
//! therefore run one at a time against a context, in a fixed order, and a
//! context is never shared between concurrent runs.

#[cfg(feature = "browser")]
pub mod chromium;
pub mod static_page;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{PageError, Result};

#[cfg(feature = "browser")]
pub use chromium::ChromiumPage;
pub use static_page::StaticPage;

/// Reference to the `index`-th element matching `selector`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
    pub index: usize,
}

impl ElementHandle {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

/// Decides which image URLs count as full-size.
#[derive(Debug, Clone)]
pub struct ImagePredicate {
    pattern: Regex,
}

impl ImagePredicate {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    pub fn from_pattern(pattern: &str) -> Result<Self> {
        Ok(Self::new(Regex::new(pattern)?))
    }

    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Count distinct URLs that qualify.
    pub fn count_distinct<'a, I>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        urls.into_iter()
            .filter(|u| self.matches(u))
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Capabilities a strategy needs from a page.
#[async_trait]
pub trait PageContext: Send {
    /// Locate the `index`-th element matching `selector`.
    async fn find_nth(
        &mut self,
        selector: &str,
        index: usize,
    ) -> std::result::Result<Option<ElementHandle>, PageError>;

    /// Locate the first element matching `selector`.
    async fn find_element(
        &mut self,
        selector: &str,
    ) -> std::result::Result<Option<ElementHandle>, PageError> {
        self.find_nth(selector, 0).await
    }

    /// Click a previously located element.
    async fn click(&mut self, element: &ElementHandle) -> std::result::Result<(), PageError>;

    /// Let the page settle.
    async fn wait(&mut self, duration: Duration) -> std::result::Result<(), PageError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    /// Number of distinct qualifying images currently on the page.
    async fn count_matching(
        &mut self,
        predicate: &ImagePredicate,
    ) -> std::result::Result<usize, PageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_distinct_dedups() {
        let predicate = ImagePredicate::from_pattern(r"_600x450\.jpg$").unwrap();
        let urls = [
            "https://img.example.org/a_600x450.jpg",
            "https://img.example.org/a_600x450.jpg",
            "https://img.example.org/b_600x450.jpg",
            "https://img.example.org/b_50x50c.jpg",
        ];
        assert_eq!(predicate.count_distinct(urls), 2);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ImagePredicate::from_pattern("[").is_err());
    }
}
