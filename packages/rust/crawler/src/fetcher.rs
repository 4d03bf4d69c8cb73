//! Two-path page fetcher.
//!
//! 1. **Direct**: a short-timeout GET, accepted only for plain-text/code URLs
//!    answering 200. Code-host "blob" views are rewritten to their raw form.
//! 2. **Rendered**: the configured [`Renderer`] produces the settled DOM, from
//!    which the primary content and visible links are extracted.
//!
//! Fetch failures never surface as errors: they are logged and yield an
//! empty, unsuccessful [`FetchedPage`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use footprint_shared::{FetchConfig, FootprintError, Link, Result};

use crate::content;
use crate::link_filter::{has_text_extension, is_code_host};
use crate::renderer::{self, Renderer};

/// Which path produced a page's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    Direct,
    Rendered,
    Failed,
}

/// Content and links retrieved for one URL.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The requested URL.
    pub url: String,
    /// Link-preserving text content (empty on failure).
    pub content: String,
    /// Visible links (always empty for the direct path).
    pub links: Vec<Link>,
    /// Path that produced the content.
    pub path: FetchPath,
}

impl FetchedPage {
    /// An unsuccessful fetch.
    pub fn failed(url: &str) -> Self {
        Self {
            url: url.to_string(),
            content: String::new(),
            links: Vec::new(),
            path: FetchPath::Failed,
        }
    }

    pub fn success(&self) -> bool {
        self.path != FetchPath::Failed
    }
}

/// The fetch capability the audit orchestrator depends on.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL. Never fails; failures come back as [`FetchPath::Failed`].
    async fn fetch(&self, url: &str) -> FetchedPage;

    /// Release long-lived resources (the browser session).
    async fn shutdown(&self);
}

/// Default [`PageFetcher`]: direct GET first, renderer as fallback.
pub struct Fetcher {
    client: Client,
    renderer: Box<dyn Renderer>,
}

impl Fetcher {
    /// Build a fetcher with the renderer selected in `config`.
    pub async fn launch(config: &FetchConfig) -> Result<Self> {
        let renderer = renderer::launch(config).await?;
        Self::with_renderer(config, renderer)
    }

    /// Build a fetcher around an existing renderer.
    pub fn with_renderer(config: &FetchConfig, renderer: Box<dyn Renderer>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.direct_timeout)
            .build()
            .map_err(|e| FootprintError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, renderer })
    }

    /// Direct GET for plain-text resources. `None` means "use the rendered path".
    pub async fn fetch_direct(&self, url: &str) -> Option<String> {
        if !has_text_extension(url) {
            debug!(%url, "direct fetch skipped (not a text resource)");
            return None;
        }

        let target = raw_content_url(url);
        if target != url {
            debug!(%url, %target, "rewrote to raw content URL");
        }

        let response = match self.client.get(&target).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(%url, error = %e, "direct fetch failed");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!(%url, status = %response.status(), "direct fetch rejected status");
            return None;
        }

        match response.text().await {
            Ok(text) => {
                debug!(%url, len = text.len(), "direct fetch succeeded");
                Some(text)
            }
            Err(e) => {
                warn!(%url, error = %e, "direct fetch body read failed");
                None
            }
        }
    }

    /// Render the page and extract its primary content and visible links.
    pub async fn fetch_rendered(&self, url: &str) -> Result<(String, Vec<Link>)> {
        let base = Url::parse(url)
            .map_err(|e| FootprintError::validation(format!("invalid URL '{url}': {e}")))?;
        let html = self.renderer.render(url).await?;

        let text = content::primary_content(&html);
        let links = content::extract_links(&html, &base);
        Ok((text, links))
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    #[instrument(skip(self), fields(renderer = self.renderer.name()))]
    async fn fetch(&self, url: &str) -> FetchedPage {
        if let Some(text) = self.fetch_direct(url).await {
            return FetchedPage {
                url: url.to_string(),
                content: text,
                links: Vec::new(),
                path: FetchPath::Direct,
            };
        }

        match self.fetch_rendered(url).await {
            Ok((text, links)) => {
                debug!(len = text.len(), links = links.len(), "rendered fetch succeeded");
                FetchedPage {
                    url: url.to_string(),
                    content: text,
                    links,
                    path: FetchPath::Rendered,
                }
            }
            Err(e) => {
                warn!(error = %e, "rendered fetch failed");
                FetchedPage::failed(url)
            }
        }
    }

    async fn shutdown(&self) {
        if let Err(e) = self.renderer.shutdown().await {
            warn!(error = %e, "renderer shutdown failed");
        }
    }
}

/// Rewrite a code-host file view (`/blob/`) to its raw-content path.
pub fn raw_content_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if is_code_host(&parsed) && parsed.path().contains("/blob/") => {
            url.replacen("/blob/", "/raw/", 1)
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_shared::RendererKind;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn http_fetcher() -> Fetcher {
        let config = FetchConfig {
            renderer: RendererKind::Http,
            direct_timeout: Duration::from_secs(5),
            ..FetchConfig::default()
        };
        Fetcher::launch(&config).await.unwrap()
    }

    #[test]
    fn raw_rewrite_only_on_code_hosts() {
        assert_eq!(
            raw_content_url("https://github.com/alice/app/blob/main/src/main.py"),
            "https://github.com/alice/app/raw/main/src/main.py"
        );
        assert_eq!(
            raw_content_url("https://alice.dev/blob/post.md"),
            "https://alice.dev/blob/post.md"
        );
        assert_eq!(
            raw_content_url("https://github.com/alice/app/tree/main"),
            "https://github.com/alice/app/tree/main"
        );
    }

    #[tokio::test]
    async fn direct_path_serves_code_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/src/main.py"))
            .respond_with(ResponseTemplate::new(200).set_body_string("print('hi')\n"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = http_fetcher().await;
        let page = fetcher.fetch(&format!("{}/src/main.py", server.uri())).await;

        assert_eq!(page.path, FetchPath::Direct);
        assert_eq!(page.content, "print('hi')\n");
        assert!(page.links.is_empty());
    }

    #[tokio::test]
    async fn html_pages_fall_back_to_rendered_path() {
        let server = MockServer::start().await;
        let html = r#"<html><body><h1>Alice</h1><a href="/projects">Projects</a></body></html>"#;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let fetcher = http_fetcher().await;
        let page = fetcher.fetch(&format!("{}/", server.uri())).await;

        assert_eq!(page.path, FetchPath::Rendered);
        assert!(page.content.contains("Alice"));
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0].href, format!("{}/projects", server.uri()));
    }

    #[tokio::test]
    async fn non_200_direct_response_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes.md"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = http_fetcher().await;
        assert!(fetcher
            .fetch_direct(&format!("{}/notes.md", server.uri()))
            .await
            .is_none());

        // The renderer also gets a 404, so the page degrades to empty.
        let page = fetcher.fetch(&format!("{}/notes.md", server.uri())).await;
        assert!(!page.success());
        assert!(page.content.is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_degrades_to_failed_page() {
        let fetcher = http_fetcher().await;
        let page = fetcher.fetch("http://127.0.0.1:9/nothing-here").await;
        assert_eq!(page.path, FetchPath::Failed);
        fetcher.shutdown().await;
    }
}
