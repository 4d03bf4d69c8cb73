//! Page content and link extraction from rendered HTML.
//!
//! The rendered fetch path hands over the final DOM as HTML; this module
//! reduces it to link-preserving Markdown text and to the list of visible
//! navigation links.

use std::collections::HashSet;

use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use footprint_shared::Link;

/// Containers holding a repository README or article body, tried in order.
const CONTENT_CONTAINERS: &[&str] = &[
    "article.markdown-body",
    "div.markdown-body",
    "#readme article",
];

/// Tags dropped during Markdown conversion.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "img", "head"];

/// Tags whose subtree is never visible.
const INVISIBLE_TAGS: &[&str] = &["head", "template", "noscript", "script", "style"];

/// Extract the page's primary content as Markdown.
///
/// If a README/article container exists only that container is converted,
/// otherwise the whole document.
pub fn primary_content(html: &str) -> String {
    let doc = Html::parse_document(html);

    for sel_str in CONTENT_CONTAINERS {
        let sel = Selector::parse(sel_str).expect("static selector");
        if let Some(el) = doc.select(&sel).next() {
            debug!(container = sel_str, "using content container");
            return to_markdown(&el.inner_html(), &doc);
        }
    }

    to_markdown(html, &doc)
}

/// Convert HTML to Markdown (links kept), falling back to plain text.
fn to_markdown(html: &str, doc: &Html) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    match converter.convert(html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(e) => {
            debug!(error = %e, "htmd conversion failed, using plain text");
            collapse_whitespace(&doc.root_element().text().collect::<String>())
        }
    }
}

/// Extract visible anchor-like elements as absolute links.
///
/// `mailto:`, `tel:` and `javascript:` targets are skipped, elements without
/// text are skipped, and links are deduplicated by resolved URL.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Link> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(r#"a[href], [role="link"][href]"#).expect("static selector");

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        let lower = href.to_ascii_lowercase();
        if href.is_empty()
            || lower.starts_with("mailto:")
            || lower.starts_with("tel:")
            || lower.starts_with("javascript:")
        {
            continue;
        }

        if is_hidden(el) {
            continue;
        }

        let text = collapse_whitespace(&el.text().collect::<String>());
        if text.is_empty() {
            continue;
        }

        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            links.push(Link {
                text,
                href: resolved,
            });
        }
    }

    debug!(count = links.len(), "extracted links");
    links
}

/// Whether the element or any ancestor is hidden from the user.
fn is_hidden(el: ElementRef<'_>) -> bool {
    if hides(el.value()) {
        return true;
    }
    el.ancestors()
        .filter_map(|node| node.value().as_element())
        .any(hides)
}

fn hides(el: &Element) -> bool {
    if INVISIBLE_TAGS.contains(&el.name()) {
        return true;
    }
    if el.attr("hidden").is_some() {
        return true;
    }
    if el.attr("aria-hidden") == Some("true") {
        return true;
    }
    el.attr("style").is_some_and(|style| {
        let style: String = style
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://alice.dev/").unwrap()
    }

    #[test]
    fn readme_container_wins() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <article class="markdown-body"><h1>CoolApp</h1><p>A <a href="https://coolapp.dev">demo</a>.</p></article>
            <footer>Footer noise</footer>
        </body></html>"#;
        let content = primary_content(html);
        assert!(content.contains("CoolApp"));
        assert!(content.contains("https://coolapp.dev"));
        assert!(!content.contains("Footer noise"));
    }

    #[test]
    fn full_page_without_container() {
        let html = r#"<html><head><title>t</title><script>var x = 1;</script></head>
            <body><h1>Alice</h1><p>See <a href="/projects">projects</a></p><footer>Footer text</footer></body></html>"#;
        let content = primary_content(html);
        assert!(content.contains("Alice"));
        assert!(content.contains("/projects"));
        assert!(content.contains("Footer text"));
        assert!(!content.contains("var x"));
    }

    #[test]
    fn links_are_resolved_deduplicated_and_filtered() {
        let html = r##"<html><body>
            <a href="/projects">Projects</a>
            <a href="https://alice.dev/projects">Projects again</a>
            <a href="mailto:alice@example.com">Mail</a>
            <a href="tel:+123">Call</a>
            <a href="javascript:void(0)">Menu</a>
            <a href="#experience">Experience</a>
            <a href="/empty"></a>
            <span role="link" href="/about">About</span>
        </body></html>"##;
        let links = extract_links(html, &base());
        let hrefs: Vec<&str> = links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "https://alice.dev/projects",
                "https://alice.dev/#experience",
                "https://alice.dev/about",
            ]
        );
        assert_eq!(links[0].text, "Projects");
    }

    #[test]
    fn hidden_links_are_skipped() {
        let html = r#"<html><body>
            <a href="/visible">Visible</a>
            <a href="/hidden" hidden>Hidden attr</a>
            <a href="/aria" aria-hidden="true">Aria</a>
            <div style="display: none"><a href="/styled">Styled</a></div>
            <template><a href="/tpl">Template</a></template>
        </body></html>"#;
        let links = extract_links(html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "https://alice.dev/visible");
    }
}
