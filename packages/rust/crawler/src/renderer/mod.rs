//! Renderer abstraction for the rendered (slow) fetch path.
//!
//! A [`Renderer`] turns a URL into the final HTML of the page. The Chromium
//! backend executes JavaScript, waits for hydration and scrolls to trigger
//! lazy content; the HTTP backend is a plain GET for environments without a
//! browser.

pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use footprint_shared::{FetchConfig, FootprintError, RendererKind, Result};

pub use chromium::ChromiumRenderer;

/// A page-rendering backend shared by all workers of one audit.
///
/// Implementations must isolate concurrent `render` calls from each other
/// (one browser page per call, or no shared navigation state at all).
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url` and return the settled page HTML.
    async fn render(&self, url: &str) -> Result<String>;

    /// Release browser resources. Safe to call more than once.
    async fn shutdown(&self) -> Result<()>;

    /// Backend name for tracing.
    fn name(&self) -> &str;
}

/// Launch the renderer selected in `config`.
pub async fn launch(config: &FetchConfig) -> Result<Box<dyn Renderer>> {
    match config.renderer {
        RendererKind::Chromium => Ok(Box::new(ChromiumRenderer::launch(config).await?)),
        RendererKind::Http => Ok(Box::new(HttpRenderer::new(config)?)),
    }
}

// ---------------------------------------------------------------------------
// HTTP renderer
// ---------------------------------------------------------------------------

/// Renderer that performs a plain GET; no JavaScript is executed.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.navigation_timeout.max(Duration::from_secs(1)))
            .build()
            .map_err(|e| FootprintError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        debug!(%url, "http render");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FootprintError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FootprintError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| FootprintError::Network(format!("{url}: body read failed: {e}")))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_config() -> FetchConfig {
        FetchConfig {
            renderer: RendererKind::Http,
            ..FetchConfig::default()
        }
    }

    #[tokio::test]
    async fn http_renderer_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Hi</h1>"))
            .mount(&server)
            .await;

        let renderer = launch(&http_config()).await.unwrap();
        assert_eq!(renderer.name(), "http");
        let html = renderer.render(&server.uri()).await.unwrap();
        assert_eq!(html, "<h1>Hi</h1>");
        renderer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn http_renderer_errors_on_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(&http_config()).unwrap();
        let err = renderer.render(&server.uri()).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
