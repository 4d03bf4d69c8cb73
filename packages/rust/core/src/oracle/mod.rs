//! Oracle boundary: page classification, navigation selection, extraction.
//!
//! The orchestrator depends only on the [`Oracle`] trait. Implementations
//! must never fail: exhausted retries and unusable replies come back as
//! empty results ([`Decision::skip`], an empty fragment, no links).

pub mod openrouter;
mod prompts;
pub mod review;

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use footprint_crawler::RankedLink;
use footprint_shared::{Category, Item, Link, ProfileFragment};

pub use openrouter::OpenRouterOracle;

/// Links shown to `classify`.
pub const CLASSIFY_LINK_LIMIT: usize = 40;
/// Content preview shown to `classify`.
pub const CLASSIFY_PREVIEW_CHARS: usize = 8_000;
/// Content shown to `extract`.
pub const EXTRACT_CONTENT_CHARS: usize = 60_000;

/// What to do with a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Extract,
    Navigate,
    Skip,
}

impl PageAction {
    /// Parse an action name; anything unrecognized is a skip.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "extract" => Self::Extract,
            "navigate" => Self::Navigate,
            _ => Self::Skip,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Navigate => "navigate",
            Self::Skip => "skip",
        }
    }
}

/// Classification result for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: PageAction,
    /// Follow-up URLs (meaningful for [`PageAction::Navigate`]).
    pub target_urls: Vec<String>,
}

impl Decision {
    pub fn skip() -> Self {
        Self {
            action: PageAction::Skip,
            target_urls: Vec::new(),
        }
    }

    pub fn extract() -> Self {
        Self {
            action: PageAction::Extract,
            target_urls: Vec::new(),
        }
    }

    /// Read a decision from arbitrary JSON.
    ///
    /// Accepts `target_urls` as a list or a single string, and a singular
    /// `target_url` key. Missing or unknown actions are skips.
    pub fn from_value(value: &Value) -> Self {
        let action = value
            .get("action")
            .and_then(Value::as_str)
            .map(PageAction::parse)
            .unwrap_or(PageAction::Skip);

        let mut target_urls = Vec::new();
        for key in ["target_urls", "target_url"] {
            match value.get(key) {
                Some(Value::Array(urls)) => target_urls.extend(
                    urls.iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|u| !u.is_empty())
                        .map(String::from),
                ),
                Some(Value::String(url)) if !url.trim().is_empty() => {
                    target_urls.push(url.trim().to_string());
                }
                _ => {}
            }
        }
        target_urls.dedup();

        Self {
            action,
            target_urls,
        }
    }
}

/// The reasoning service the audit consults.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Pick which ranked root links to visit.
    async fn select_links(&self, goal: &str, candidates: &[RankedLink], root_url: &str)
    -> Vec<String>;

    /// Decide whether to extract from, navigate away from, or skip a page.
    async fn classify(
        &self,
        url: &str,
        content: &str,
        links: &[Link],
        goal: &str,
        root_url: &str,
    ) -> Decision;

    /// Pull structured items out of page content.
    async fn extract(&self, content: &str, goal: &str, url: &str) -> ProfileFragment;
}

// ---------------------------------------------------------------------------
// Helpers shared by oracle implementations
// ---------------------------------------------------------------------------

/// The first `max_chars` characters of `content`.
pub fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Phrases that mark an "about me" paragraph rather than a role.
const BIO_PHRASES: &[&str] = &[
    "i am a",
    "specializes in",
    "focused on",
    "based in",
    "passionate about",
    "currently studying",
    "hello, i'm",
];

/// Titles that are placeholders, not roles.
const PLACEHOLDER_TITLES: &[&str] = &["no experience", "coming soon", "experience section"];

/// Roles without a duration need at least this many title characters, or an
/// employer marker (" at " / "@"), to be kept.
const MIN_BARE_TITLE_CHARS: usize = 20;

/// Drop hallucinated experience entries and collapse duplicates within one
/// extraction result.
pub fn clean_fragment(mut fragment: ProfileFragment) -> ProfileFragment {
    if let Some(experience) = fragment.sections.get_mut(&Category::Experience) {
        let before = experience.len();
        let mut seen = HashSet::new();
        experience.retain(|item| !is_noise_role(item) && seen.insert(role_fingerprint(item)));
        if experience.len() < before {
            debug!(dropped = before - experience.len(), "dropped noisy experience");
        }
    }

    if let Some(projects) = fragment.sections.get_mut(&Category::Projects) {
        let mut seen = HashSet::new();
        projects.retain(|item| {
            let title = item.text("title").unwrap_or_default();
            let key: String = title
                .chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect();
            // Untitled projects are never collapsed here.
            key.is_empty() || seen.insert(key)
        });
    }

    fragment.sections.retain(|_, items| !items.is_empty());
    fragment
}

/// Placeholders, bio paragraphs, and bare job titles with no duration.
fn is_noise_role(item: &Item) -> bool {
    let title = item.text("title").unwrap_or_default().to_lowercase();
    if PLACEHOLDER_TITLES.iter().any(|p| title.contains(p)) {
        return true;
    }

    let has_duration = item
        .get("duration")
        .is_some_and(|d| !footprint_shared::is_empty_value(d));
    if has_duration {
        return false;
    }

    let description = item.text("description").unwrap_or_default().to_lowercase();
    if BIO_PHRASES.iter().any(|p| description.contains(p)) {
        return true;
    }
    title.chars().count() < MIN_BARE_TITLE_CHARS && !title.contains(" at ") && !title.contains('@')
}

/// Near-duplicate roles share a title prefix and description prefix.
fn role_fingerprint(item: &Item) -> String {
    let title: String = item
        .text("title")
        .unwrap_or_default()
        .to_lowercase()
        .chars()
        .take(10)
        .collect();
    let description: String = item
        .text("description")
        .unwrap_or_default()
        .to_lowercase()
        .chars()
        .take(20)
        .collect();
    format!("{title}_{description}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decision_parsing_is_tolerant() {
        let d = Decision::from_value(&json!({"action": "NAVIGATE", "target_urls": ["https://a.dev/p", " ", 3]}));
        assert_eq!(d.action, PageAction::Navigate);
        assert_eq!(d.target_urls, ["https://a.dev/p"]);

        let d = Decision::from_value(&json!({"action": "navigate", "target_url": "https://a.dev/x"}));
        assert_eq!(d.target_urls, ["https://a.dev/x"]);

        assert_eq!(Decision::from_value(&json!({})), Decision::skip());
        assert_eq!(Decision::from_value(&json!({"action": "explode"})).action, PageAction::Skip);
        assert_eq!(Decision::from_value(&json!("extract")), Decision::skip());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn cleaning_drops_placeholders_and_bio() {
        let mut fragment = ProfileFragment::new();
        fragment.push_items(
            Category::Experience,
            vec![
                Item::new().with("title", "No Experience Listed"),
                Item::new().with("title", "About").with("description", "I am a developer based in Pune"),
                Item::new()
                    .with("title", "Intern @ Acme")
                    .with("description", "I am a quick learner")
                    .with("duration", "2023"),
                Item::new().with("title", "Engineer at Initech"),
            ],
        );

        let cleaned = clean_fragment(fragment);
        let titles: Vec<&str> = cleaned.sections[&Category::Experience]
            .iter()
            .filter_map(|i| i.text("title"))
            .collect();
        assert_eq!(titles, ["Intern @ Acme", "Engineer at Initech"]);
    }

    #[test]
    fn cleaning_drops_bare_titles_without_duration() {
        let mut fragment = ProfileFragment::new();
        fragment.push_items(
            Category::Experience,
            vec![
                Item::new().with("title", "Software Engineer"),
                Item::new().with("title", "Software Engineer").with("duration", "2022 - now"),
                Item::new().with("title", "SWE @ Initech"),
                Item::new().with("title", "Senior Platform Engineer, Payments"),
            ],
        );

        let cleaned = clean_fragment(fragment);
        let experience = &cleaned.sections[&Category::Experience];
        assert_eq!(experience.len(), 3);
        assert!(experience[0].get("duration").is_some());
        assert_eq!(experience[1].text("title"), Some("SWE @ Initech"));
    }

    #[test]
    fn cleaning_collapses_near_duplicate_roles() {
        let mut fragment = ProfileFragment::new();
        fragment.push_items(
            Category::Experience,
            vec![
                Item::new()
                    .with("title", "Backend Engineer @ Acme")
                    .with("description", "Built the billing pipeline in Rust")
                    .with("duration", "2021-2023"),
                Item::new()
                    .with("title", "Backend Engineer at Acme Corp")
                    .with("description", "Built the billing pipeline and more")
                    .with("duration", "2021-2023"),
                Item::new()
                    .with("title", "Backend Engineer @ Acme")
                    .with("description", "Ran the on-call rotation")
                    .with("duration", "2023"),
            ],
        );

        let cleaned = clean_fragment(fragment);
        let descriptions: Vec<&str> = cleaned.sections[&Category::Experience]
            .iter()
            .filter_map(|i| i.text("description"))
            .collect();
        assert_eq!(
            descriptions,
            ["Built the billing pipeline in Rust", "Ran the on-call rotation"]
        );
    }

    #[test]
    fn cleaning_collapses_duplicate_projects() {
        let mut fragment = ProfileFragment::new();
        fragment.push_items(
            Category::Projects,
            vec![
                Item::new().with("title", "Chat App"),
                Item::new().with("title", "chatapp").with("description", "dup"),
                Item::new().with("description", "untitled one"),
                Item::new().with("description", "untitled two"),
            ],
        );
        let cleaned = clean_fragment(fragment);
        assert_eq!(cleaned.sections[&Category::Projects].len(), 3);
    }

    #[test]
    fn cleaning_removes_emptied_sections() {
        let mut fragment = ProfileFragment::new();
        fragment.push_items(
            Category::Experience,
            vec![Item::new().with("title", "Coming soon")],
        );
        assert!(clean_fragment(fragment).is_empty());
    }
}
