use std::time::Duration;

use chrome_browser::{ChromeBrowser, ChromeLaunchOptions};
use tracing::debug;

use crate::error::RenderError;

/// `render(url, settle) -> html` capability used by the rendered strategies.
pub trait PageRenderer {
    async fn render(&self, url: &str, settle: Duration) -> Result<String, RenderError>;
}

/**
    Headless Chrome renderer.

    Launches a fresh browser per call and always closes it before returning,
    whether navigation and capture succeeded or not.
*/
pub struct ChromeRenderer {
    pub headless: bool,
    pub proxy: Option<String>,
    pub navigation_timeout: Duration,
}

impl ChromeRenderer {
    async fn capture(
        &self,
        browser: &ChromeBrowser,
        url: &str,
        settle: Duration,
    ) -> Result<String, RenderError> {
        let tab = browser
            .get_tab(0)
            .await
            .ok_or_else(|| RenderError::Capture("no browser tab available".to_string()))?;

        debug!("Navigating to: {}", url);
        match tokio::time::timeout(self.navigation_timeout, tab.navigate(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    message: format!("{e:#}"),
                });
            }
            Err(_) => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                    timeout: self.navigation_timeout,
                });
            }
        }

        // The page exposes no readiness signal, so wait a fixed time.
        debug!("Waiting {:?} for client-side rendering", settle);
        tokio::time::sleep(settle).await;

        let value = tab
            .eval_json("document.documentElement.outerHTML", false)
            .await
            .map_err(|e| RenderError::Capture(format!("{e:#}")))?;

        let html = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        let _ = tab.navigate("about:blank").await;

        debug!("Captured {} bytes of rendered HTML", html.len());
        Ok(html)
    }
}

impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str, settle: Duration) -> Result<String, RenderError> {
        let mut options = ChromeLaunchOptions::default()
            .headless(self.headless)
            .devtools(false)
            .enable_gpu(self.headless);

        if let Some(ref proxy) = self.proxy {
            options = options.proxy_server(proxy);
        }

        debug!("Launching Chrome (headless: {})", self.headless);
        let browser = ChromeBrowser::new(options)
            .await
            .map_err(|e| RenderError::Launch(format!("{e:#}")))?;

        let result = self.capture(&browser, url, settle).await;
        let _ = browser.close().await;
        result
    }
}

/// Renderer selected at startup: real Chrome, or none at all.
pub enum Renderer {
    Chrome(ChromeRenderer),
    Disabled,
}

impl PageRenderer for Renderer {
    async fn render(&self, url: &str, settle: Duration) -> Result<String, RenderError> {
        match self {
            Renderer::Chrome(chrome) => chrome.render(url, settle).await,
            Renderer::Disabled => Err(RenderError::Unavailable),
        }
    }
}
