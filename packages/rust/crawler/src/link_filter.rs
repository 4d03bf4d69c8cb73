//! Deterministic URL classification: noise filtering, source-code detection,
//! and priority ranking of navigation candidates.
//!
//! Everything here is pure: no I/O, same input always yields the same output.

use footprint_shared::Link;
use url::Url;

/// Hosts whose sub-paths are mostly repository metadata rather than content.
const CODE_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

/// Content-browsing path segments that stay allowed on code hosts.
const CONTENT_NAVIGATION: &[&str] = &["/blob/", "/tree/", "/src/"];

/// Repository metadata paths that never contain profile content.
const NOISE_PATTERNS: &[&str] = &[
    "/commit/",
    "/commits/",
    "/blame/",
    "/compare/",
    "/issues",
    "/pulls",
    "/merge_requests",
    "/actions",
    "/projects",
    "/security",
    "/pulse",
    "/find/",
    "/stargazers",
    "/watchers",
    "/network",
    "/search",
    "/forks",
    "/discussions",
];

/// Extensions that unambiguously denote source code.
const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "go", "rs", "java", "cpp", "c", "h", "hpp", "cs", "rb",
    "kt", "swift",
];

/// Extensions the direct fetch path accepts as plain text.
const TEXT_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "go", "rs", "java", "cpp", "c", "h", "hpp", "cs", "rb",
    "kt", "swift", "json", "md", "markdown", "txt",
];

/// Extensions treated as high-priority navigation targets on code hosts.
const RANKED_CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "go", "rs", "java", "cpp", "h", "css", "html", "ipynb",
];

/// Keywords marking the usual sections of a portfolio.
const SECTION_KEYWORDS: &[&str] = &[
    "project",
    "work",
    "experience",
    "education",
    "about",
    "resume",
    "cv",
    "repo",
    "academics",
];

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Whether a URL is worth visiting at all.
///
/// Rejects repository-metadata pages on known code hosts while keeping their
/// file/directory browsing pages. Unparseable and non-HTTP URLs are rejected.
pub fn is_useful(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    if !is_code_host(&parsed) {
        return true;
    }

    let path = parsed.path().to_ascii_lowercase();
    if CONTENT_NAVIGATION.iter().any(|p| path.contains(p)) {
        return true;
    }
    !NOISE_PATTERNS.iter().any(|p| path.contains(p))
}

/// Whether the URL lives on a known code-hosting domain.
pub fn is_code_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    CODE_HOSTS.contains(&host)
}

/// Whether the URL's path ends in a source-code extension.
pub fn is_source_code(url: &str) -> bool {
    extension(url).is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the URL's path ends in a plain-text extension.
pub fn has_text_extension(url: &str) -> bool {
    extension(url).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

/// Lower-cased extension of the last path segment.
fn extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Navigation priority of a candidate link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPriority {
    Low,
    Medium,
    High,
}

/// A same-site link annotated with its navigation priority.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RankedLink {
    pub text: String,
    pub href: String,
    pub priority: LinkPriority,
}

/// Keep links on the same site as `root_url`, assign priorities, and return
/// them highest-priority first (stable within a priority), capped at `limit`.
pub fn rank_links(links: &[Link], root_url: &str, limit: usize) -> Vec<RankedLink> {
    let root = Url::parse(root_url).ok();
    let on_code_host = root.as_ref().is_some_and(is_code_host);

    let mut ranked: Vec<RankedLink> = links
        .iter()
        .filter(|l| is_same_site(&l.href, root_url))
        .map(|l| RankedLink {
            text: l.text.clone(),
            href: l.href.clone(),
            priority: priority_of(l, on_code_host),
        })
        .collect();

    ranked.sort_by(|a, b| b.priority.cmp(&a.priority));
    ranked.truncate(limit);
    ranked
}

fn priority_of(link: &Link, on_code_host: bool) -> LinkPriority {
    let text = link.text.to_lowercase();
    let href = link.href.to_lowercase();

    let mut priority = LinkPriority::Low;
    if SECTION_KEYWORDS
        .iter()
        .any(|k| text.contains(k) || href.contains(k))
    {
        priority = LinkPriority::High;
    }

    if on_code_host {
        if href.contains("/tree/") || href.contains("/blob/") {
            priority = priority.max(LinkPriority::Medium);
        }
        let ends_with_code = |s: &str| {
            RANKED_CODE_EXTENSIONS
                .iter()
                .any(|ext| s.ends_with(&format!(".{ext}")))
        };
        if ends_with_code(&href) || ends_with_code(&text) {
            priority = LinkPriority::High;
        }
    }

    priority
}

/// Whether `link` points at the same site as `root`.
///
/// Relative links are same-site. Hosts are compared without `www.` and port;
/// one host containing the other counts as a match (subdomains of the root).
pub fn is_same_site(link: &str, root: &str) -> bool {
    if root.is_empty() || link.starts_with('/') || link.starts_with('#') {
        return true;
    }
    match (site_host(link), site_host(root)) {
        (Some(l), Some(r)) => l.contains(&r) || r.contains(&l),
        _ => false,
    }
}

fn site_host(url: &str) -> Option<String> {
    let with_scheme = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };
    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_host_noise_is_rejected() {
        assert!(!is_useful("https://github.com/alice/app/commits/main"));
        assert!(!is_useful("https://github.com/alice/app/commit/3f2a1b"));
        assert!(!is_useful("https://github.com/alice/app/issues"));
        assert!(!is_useful("https://github.com/alice/app/pulls"));
        assert!(!is_useful("https://github.com/alice/app/network/members"));
        assert!(!is_useful("https://www.github.com/alice/app/stargazers"));
        assert!(!is_useful("https://gitlab.com/alice/app/-/merge_requests"));
    }

    #[test]
    fn code_host_content_navigation_is_allowed() {
        assert!(is_useful("https://github.com/alice/app/blob/main/src/lib.rs"));
        assert!(is_useful("https://github.com/alice/app/tree/main/src"));
        assert!(is_useful("https://github.com/alice/app"));
        // Browsing wins even when a noise word appears deeper in the path.
        assert!(is_useful("https://github.com/alice/app/tree/main/issues"));
    }

    #[test]
    fn other_hosts_are_not_filtered() {
        assert!(is_useful("https://alice.dev/projects"));
        assert!(is_useful("https://alice.dev/search"));
    }

    #[test]
    fn malformed_and_non_http_are_rejected() {
        assert!(!is_useful(""));
        assert!(!is_useful("not a url"));
        assert!(!is_useful("mailto:alice@example.com"));
        assert!(!is_useful("ftp://alice.dev/file"));
    }

    #[test]
    fn filter_is_deterministic() {
        let urls = [
            "https://github.com/alice/app/commits/main",
            "https://github.com/alice/app/blob/main/main.py",
        ];
        let first: Vec<bool> = urls.iter().map(|u| is_useful(u)).collect();
        let second: Vec<bool> = urls.iter().map(|u| is_useful(u)).collect();
        assert_eq!(first, vec![false, true]);
        assert_eq!(first, second);
    }

    #[test]
    fn extensions() {
        assert!(is_source_code("https://github.com/a/b/blob/main/app.py"));
        assert!(is_source_code("https://x.dev/Main.JAVA"));
        assert!(!is_source_code("https://x.dev/README.md"));
        assert!(!is_source_code("https://x.dev/projects"));
        assert!(has_text_extension("https://x.dev/README.md"));
        assert!(has_text_extension("https://x.dev/data.json?raw=1"));
        assert!(!has_text_extension("https://x.dev/logo.png"));
        assert!(!has_text_extension("https://x.dev/.env"));
    }

    #[test]
    fn same_site_comparison() {
        assert!(is_same_site("/about", "https://alice.dev"));
        assert!(is_same_site("https://www.alice.dev/work", "https://alice.dev"));
        assert!(is_same_site("https://blog.alice.dev/x", "https://alice.dev"));
        assert!(is_same_site("https://alice.dev:8443/x", "https://alice.dev"));
        assert!(!is_same_site("https://twitter.com/alice", "https://alice.dev"));
    }

    #[test]
    fn ranking_orders_sections_first_and_drops_offsite() {
        let links = vec![
            Link::new("Blog", "https://alice.dev/blog"),
            Link::new("Twitter", "https://twitter.com/alice"),
            Link::new("My Projects", "https://alice.dev/projects"),
            Link::new("Contact", "https://alice.dev/contact"),
            Link::new("Resume", "https://alice.dev/resume.pdf"),
        ];
        let ranked = rank_links(&links, "https://alice.dev", 60);
        let hrefs: Vec<&str> = ranked.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "https://alice.dev/projects",
                "https://alice.dev/resume.pdf",
                "https://alice.dev/blog",
                "https://alice.dev/contact",
            ]
        );
        assert_eq!(ranked[0].priority, LinkPriority::High);
        assert_eq!(ranked[3].priority, LinkPriority::Low);

        assert_eq!(rank_links(&links, "https://alice.dev", 1).len(), 1);
    }

    #[test]
    fn ranking_on_code_host() {
        let root = "https://github.com/alice/app";
        let links = vec![
            Link::new("LICENSE", "https://github.com/alice/app/blob/main/LICENSE"),
            Link::new("src", "https://github.com/alice/app/tree/main/src"),
            Link::new("main.py", "https://github.com/alice/app/blob/main/main.py"),
            Link::new("Readme", "https://github.com/alice/app#readme"),
        ];
        let ranked = rank_links(&links, root, 60);
        assert_eq!(ranked[0].href, "https://github.com/alice/app/blob/main/main.py");
        assert_eq!(ranked[0].priority, LinkPriority::High);
        assert_eq!(ranked[1].priority, LinkPriority::Medium);
        assert_eq!(ranked[2].priority, LinkPriority::Medium);
        assert_eq!(ranked[3].priority, LinkPriority::Low);
    }
}
