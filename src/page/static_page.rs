//! Page context backed by a single HTTP fetch.
//!
//! Without a script engine clicks cannot change anything, so every strategy
//! sees the same document. This is still enough for sites that ship their
//! full-size gallery URLs in the initial HTML.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{PageError, Result};
use crate::page::{ElementHandle, ImagePredicate, PageContext};
use crate::utils::{http, resolve_url};

/// Attributes that may carry an image URL.
const IMAGE_ATTRS: &[(&str, &str)] = &[
    ("img[src]", "src"),
    ("img[data-src]", "data-src"),
    ("img[data-full]", "data-full"),
    ("a[href]", "href"),
];

/// A fetched, immutable HTML document.
pub struct StaticPage {
    url: Url,
    html: String,
}

impl StaticPage {
    /// Wrap already-fetched HTML.
    pub fn from_html(url: &str, html: impl Into<String>) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            html: html.into(),
        })
    }

    /// Fetch `url` and wrap the response body.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self> {
        log::info!("Fetching {}", url);
        let html = http::fetch_text(client, url).await?;
        Self::from_html(url, html)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn parse_selector(selector: &str) -> std::result::Result<Selector, PageError> {
        Selector::parse(selector).map_err(|_| PageError::InvalidSelector(selector.to_string()))
    }

    /// Every candidate image URL in the document, resolved to absolute form.
    fn image_urls(&self) -> Vec<String> {
        let document = Html::parse_document(&self.html);
        let mut urls = Vec::new();

        for (css, attr) in IMAGE_ATTRS {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for element in document.select(&selector) {
                if let Some(value) = element.value().attr(attr) {
                    urls.push(resolve_url(&self.url, value.trim()));
                }
            }
        }

        if let Ok(selector) = Selector::parse("img[srcset], source[srcset]") {
            for element in document.select(&selector) {
                if let Some(srcset) = element.value().attr("srcset") {
                    urls.extend(
                        srcset
                            .split(',')
                            .filter_map(|candidate| candidate.split_whitespace().next())
                            .map(|src| resolve_url(&self.url, src)),
                    );
                }
            }
        }

        urls
    }
}

#[async_trait]
impl PageContext for StaticPage {
    async fn find_nth(
        &mut self,
        selector: &str,
        index: usize,
    ) -> std::result::Result<Option<ElementHandle>, PageError> {
        let parsed = Self::parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let found = document.select(&parsed).nth(index).is_some();
        Ok(found.then(|| ElementHandle::new(selector, index)))
    }

    async fn click(&mut self, element: &ElementHandle) -> std::result::Result<(), PageError> {
        log::debug!(
            "Static page ignores click on {}[{}]",
            element.selector,
            element.index
        );
        Ok(())
    }

    async fn count_matching(
        &mut self,
        predicate: &ImagePredicate,
    ) -> std::result::Result<usize, PageError> {
        let urls = self.image_urls();
        Ok(predicate.count_distinct(urls.iter().map(String::as_str)))
    }
}
