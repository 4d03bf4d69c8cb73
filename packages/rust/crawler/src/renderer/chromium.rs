//! Chromium-based renderer using chromiumoxide.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use footprint_shared::{FetchConfig, FootprintError, Result};

use super::Renderer;

/// Interval between resource-count samples while waiting for quiet.
const QUIET_POLL: Duration = Duration::from_millis(250);

/// How long the resource count must stay flat to count as network quiet.
const QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Headless Chromium renderer.
///
/// One browser process lives for the whole audit; every `render` call opens
/// its own page and closes it afterwards, so concurrent workers never share
/// navigation state.
pub struct ChromiumRenderer {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    navigation_timeout: Duration,
    settle_delay: Duration,
    scroll_iterations: u32,
    scroll_delay: Duration,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance configured from `config`.
    pub async fn launch(config: &FetchConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(config.navigation_timeout)
            .window_size(1280, 800)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", config.user_agent));

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| FootprintError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FootprintError::Browser(format!("failed to launch Chromium: {e}")))?;

        // The CDP handler must be polled for the browser to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "chromium handler event error");
                }
            }
        });

        info!(headless = config.headless, "chromium launched");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler_task)),
            navigation_timeout: config.navigation_timeout,
            settle_delay: config.settle_delay,
            scroll_iterations: config.scroll_iterations,
            scroll_delay: config.scroll_delay,
        })
    }

    /// Navigate, wait for network quiet, settle, scroll, and read back the DOM.
    ///
    /// Navigation and the quiet wait share `navigation_timeout`; the settle
    /// delay is applied afterwards regardless.
    async fn drive(&self, page: &Page, url: &str) -> Result<String> {
        let navigation = tokio::time::timeout(self.navigation_timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            wait_for_network_quiet(page).await;
            Ok::<_, CdpError>(())
        })
        .await;

        match navigation {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(FootprintError::Browser(format!("{url}: navigation failed: {e}")));
            }
            // A page that never goes quiet is usually still usable.
            Err(_) => warn!(%url, "navigation did not settle in time, continuing"),
        }

        tokio::time::sleep(self.settle_delay).await;
        self.scroll_to_bottom(page).await;

        page.evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| FootprintError::Browser(format!("{url}: failed to read DOM: {e}")))?
            .into_value::<String>()
            .map_err(|e| FootprintError::Browser(format!("{url}: DOM is not a string: {e}")))
    }

    /// Scroll until the document stops growing or the iteration cap is hit.
    async fn scroll_to_bottom(&self, page: &Page) {
        let mut previous = scroll_height(page).await;
        for _ in 0..self.scroll_iterations {
            if page
                .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
                .is_err()
            {
                break;
            }
            tokio::time::sleep(self.scroll_delay).await;

            let current = scroll_height(page).await;
            if current == previous {
                break;
            }
            previous = current;
        }
    }
}

/// Tracks resource-count samples until the count has been flat for `window`.
#[derive(Debug)]
struct QuietWindow {
    window: Duration,
    last: Option<(usize, Instant)>,
}

impl QuietWindow {
    fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Record a sample; `true` once the count has not changed for `window`.
    fn observe(&mut self, count: usize, now: Instant) -> bool {
        match self.last {
            Some((previous, since)) if previous == count => {
                now.saturating_duration_since(since) >= self.window
            }
            _ => {
                self.last = Some((count, now));
                false
            }
        }
    }
}

/// Poll the Resource Timing buffer until no new requests complete for
/// [`QUIET_WINDOW`]. Callers bound this with a timeout.
async fn wait_for_network_quiet(page: &Page) {
    let mut quiet = QuietWindow::new(QUIET_WINDOW);
    loop {
        let Some(count) = resource_count(page).await else {
            return;
        };
        if quiet.observe(count, Instant::now()) {
            debug!(resources = count, "network quiet");
            return;
        }
        tokio::time::sleep(QUIET_POLL).await;
    }
}

async fn resource_count(page: &Page) -> Option<usize> {
    page.evaluate("performance.getEntriesByType('resource').length")
        .await
        .ok()?
        .into_value::<usize>()
        .ok()
}

async fn scroll_height(page: &Page) -> Option<f64> {
    page.evaluate("document.body.scrollHeight")
        .await
        .ok()?
        .into_value::<f64>()
        .ok()
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        debug!(%url, "chromium render");
        let page = {
            let guard = self.browser.lock().await;
            let browser = guard
                .as_ref()
                .ok_or_else(|| FootprintError::Browser("browser already shut down".into()))?;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| FootprintError::Browser(format!("failed to open page: {e}")))?
        };

        let result = self.drive(&page, url).await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "failed to close page");
        }
        result
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "chromium close failed");
            }
            let _ = browser.wait().await;
            info!("chromium closed");
        }
        if let Some(handle) = self.handler.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_window_needs_a_flat_count() {
        let start = Instant::now();
        let mut quiet = QuietWindow::new(Duration::from_millis(500));

        assert!(!quiet.observe(3, start));
        assert!(!quiet.observe(3, start + Duration::from_millis(250)));
        // A new request restarts the window.
        assert!(!quiet.observe(5, start + Duration::from_millis(400)));
        assert!(!quiet.observe(5, start + Duration::from_millis(800)));
        assert!(quiet.observe(5, start + Duration::from_millis(900)));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn renders_data_url() {
        let config = FetchConfig {
            settle_delay: Duration::from_millis(10),
            scroll_delay: Duration::from_millis(10),
            ..FetchConfig::default()
        };
        let renderer = ChromiumRenderer::launch(&config)
            .await
            .expect("failed to launch chromium");

        let html = renderer
            .render("data:text/html,<h1>Hello</h1><p>World</p>")
            .await
            .expect("render failed");
        assert!(html.contains("<h1>Hello</h1>"));

        renderer.shutdown().await.expect("shutdown failed");
        assert!(renderer.render("data:text/html,x").await.is_err());
    }
}
