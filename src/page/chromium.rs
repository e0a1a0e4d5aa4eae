//! Headless Chromium page context via chromiumoxide.
//!
//! Lookups and clicks run as small in-page scripts so that a stale or
//! missing element surfaces as a plain status string instead of a protocol
//! error. Only transport failures are reported as `Unreachable`.

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use async_trait::async_trait;

use crate::error::PageError;
use crate::page::{ElementHandle, ImagePredicate, PageContext};

const COLLECT_IMAGE_URLS: &str = r#"(() => {
    const urls = [];
    for (const img of document.images) {
        urls.push(img.currentSrc, img.src, img.getAttribute('data-src'));
    }
    for (const a of document.querySelectorAll('a[href]')) {
        urls.push(a.href);
    }
    return urls.filter(Boolean);
})()"#;

/// A Chromium tab opened on a listing page.
pub struct ChromiumPage {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

impl ChromiumPage {
    /// Launch a browser and open `url`.
    pub async fn launch(url: &str, visible: bool) -> Result<Self, PageError> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if visible {
            log::info!("Launching browser in visible mode");
            builder = builder.with_head();
        }
        if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            log::info!("Using custom Chrome binary: {}", chrome_bin);
            builder = builder.chrome_executable(chrome_bin);
        }
        let config = builder
            .build()
            .map_err(|e| PageError::unreachable(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PageError::unreachable(format!("failed to launch browser: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler error (ignoring): {}", e);
                }
            }
        });

        log::info!("Opening {}", url);
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| PageError::unreachable(format!("failed to open {url}: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| PageError::unreachable(format!("navigation failed: {e}")))?;

        Ok(Self {
            browser,
            handler_task,
            page,
        })
    }

    /// Close the browser and wait for its event loop to finish.
    pub async fn close(mut self) -> Result<(), PageError> {
        self.browser
            .close()
            .await
            .map_err(|e| PageError::unreachable(format!("error closing browser: {e}")))?;
        if let Err(e) = self.handler_task.await {
            log::debug!("Browser handler task ended abnormally: {}", e);
        }
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, PageError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PageError::unreachable(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| PageError::script(format!("unexpected script result: {e}")))
    }

    fn quote(selector: &str) -> String {
        serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string())
    }
}

#[async_trait]
impl PageContext for ChromiumPage {
    async fn find_nth(
        &mut self,
        selector: &str,
        index: usize,
    ) -> Result<Option<ElementHandle>, PageError> {
        let script = format!(
            r#"(() => {{
                try {{
                    return document.querySelectorAll({sel}).length > {index} ? "found" : "missing";
                }} catch (e) {{
                    return "invalid";
                }}
            }})()"#,
            sel = Self::quote(selector),
        );
        match self.eval::<String>(script).await?.as_str() {
            "found" => Ok(Some(ElementHandle::new(selector, index))),
            "missing" => Ok(None),
            _ => Err(PageError::InvalidSelector(selector.to_string())),
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), PageError> {
        let script = format!(
            r#"(() => {{
                try {{
                    const el = document.querySelectorAll({sel})[{index}];
                    if (!el) return "missing";
                    el.scrollIntoView({{ block: "center" }});
                    el.click();
                    return "clicked";
                }} catch (e) {{
                    return "invalid";
                }}
            }})()"#,
            sel = Self::quote(&element.selector),
            index = element.index,
        );
        match self.eval::<String>(script).await?.as_str() {
            "clicked" => Ok(()),
            "missing" => Err(PageError::script(format!(
                "{}[{}] detached before click",
                element.selector, element.index
            ))),
            _ => Err(PageError::InvalidSelector(element.selector.clone())),
        }
    }

    async fn count_matching(&mut self, predicate: &ImagePredicate) -> Result<usize, PageError> {
        let urls: Vec<String> = self.eval(COLLECT_IMAGE_URLS.to_string()).await?;
        Ok(predicate.count_distinct(urls.iter().map(String::as_str)))
    }
}
