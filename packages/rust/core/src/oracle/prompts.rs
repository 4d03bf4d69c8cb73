//! Prompt construction for the chat-completion oracle.

use footprint_crawler::{RankedLink, is_code_host, is_source_code};
use url::Url;

/// Extraction instructions, chosen by the kind of page being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExtractionSchema {
    /// A single source file on a code host.
    CodeReview,
    /// A repository landing page on a code host.
    Repository,
    /// A professional-network profile.
    ProfessionalProfile,
    /// Anything else: a personal portfolio page.
    Portfolio,
}

impl ExtractionSchema {
    pub(crate) fn for_url(url: &str) -> Self {
        let Ok(parsed) = Url::parse(url) else {
            return Self::Portfolio;
        };
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        if is_code_host(&parsed) {
            if parsed.path().contains("/blob/") || is_source_code(url) {
                Self::CodeReview
            } else {
                Self::Repository
            }
        } else if host == "linkedin.com" || host.ends_with(".linkedin.com") {
            Self::ProfessionalProfile
        } else {
            Self::Portfolio
        }
    }

    fn guide(&self) -> &'static str {
        match self {
            // Code reviews use their own prompt.
            Self::CodeReview | Self::Portfolio => PORTFOLIO_GUIDE,
            Self::Repository => REPOSITORY_GUIDE,
            Self::ProfessionalProfile => PROFILE_GUIDE,
        }
    }
}

const REPOSITORY_GUIDE: &str = r#"The page is the root of a source repository.
Return exactly one project:
{"projects": [{"title": "repository name", "description": "summary of the README",
  "tech_stack": ["languages and frameworks seen in the files or README"],
  "live_link": "deployment URL stated in the description, or null",
  "repo_link": "the page URL"}]}"#;

const PROFILE_GUIDE: &str = r#"The page is a professional-network profile.
Return {"bio": "headline", "experience": [{"title": "role @ company", "duration": "dates",
  "description": "summary"}], "education": [{"degree": "...", "institution": "...",
  "duration": "dates"}]}"#;

const PORTFOLIO_GUIDE: &str = r#"The page belongs to a personal portfolio.
Return {"projects": [{"title": "project title", "description": "one or two sentences",
  "tech_stack": ["..."], "live_link": "URL or null", "repo_link": "URL or null"}],
  "experience": [{"title": "role @ company", "duration": "dates", "description": "summary"}]}"#;

pub(crate) fn select_links(goal: &str, candidates: &[RankedLink]) -> String {
    let links = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".into());
    format!(
        r#"You plan a resume audit of a personal website.
Goal: {goal}
Candidate links (JSON, highest priority first): {links}

Choose the links worth visiting.
- Prefer sections about projects, experience, about and resume.
- Include generic "view", "details" or "case study" links when they likely lead to project or work details.
- For a full audit, include every main profile section.
- On a source repository, choose only significant source files containing core logic.
- Never choose images, lock files, build configuration or trivial scripts.

Reply with a JSON object: {{"selected_urls": ["..."]}}"#
    )
}

pub(crate) fn classify(url: &str, goal: &str, preview: &str, links: &[RankedLink]) -> String {
    let links = serde_json::to_string(links).unwrap_or_else(|_| "[]".into());
    format!(
        r#"URL: {url}
Goal: "{goal}"
Page preview:
{preview}

Links on the page (JSON): {links}

Decide what to do with this page.
- "extract" when the page itself lists bio, projects, education, experience or source code (not only links to them).
- "navigate" when the page is a home or menu page with little content but links to experience, work, resume or projects. Put those links in target_urls.
- "skip" when the page is irrelevant to the goal.

Reply with a JSON object: {{"action": "extract" | "navigate" | "skip", "target_urls": ["..."]}}"#
    )
}

pub(crate) fn extract(goal: &str, url: &str, content: &str, schema: ExtractionSchema) -> String {
    let guide = schema.guide();
    format!(
        r#"You are auditing a candidate's public footprint for a resume review.
Goal: {goal}
URL: {url}

--- CONTENT ---
{content}
--- END CONTENT ---

{guide}

Rules:
- Capture every project card or role that is actually shown, even when some fields are missing. Use null for missing fields.
- Never invent data. A section that is empty or says "coming soon" is an empty list.
- Never create meta entries such as "Experience section" or "No experience listed".
- live_link only when the page states a deployment or live demo.
- Ignore project mentions that are part of an experience, about or blog section unless they are separate side projects.

Reply with a single JSON object."#
    )
}

pub(crate) fn code_review(content: &str) -> String {
    format!(
        r#"You are a senior technical interviewer reviewing one source file.
Score each dimension from 0 to 5. Functional, clean code starts at 3.
Judge the file for what it is: a small script is not penalized for lacking enterprise patterns.
Only deduct for real flaws, and base every score on visible evidence. Testing is out of scope.

Reply with a JSON object:
{{"scores": {{"code_quality": n, "architecture": n, "readability": n, "security": n}},
  "summary": "four sentences, one per dimension, under 100 words in total",
  "confidence": number between 0 and 1}}

--- FILE ---
{content}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_crawler::LinkPriority;

    #[test]
    fn schema_follows_url() {
        assert_eq!(
            ExtractionSchema::for_url("https://github.com/alice/app/blob/main/src/app.ts"),
            ExtractionSchema::CodeReview
        );
        assert_eq!(
            ExtractionSchema::for_url("https://github.com/alice/app"),
            ExtractionSchema::Repository
        );
        assert_eq!(
            ExtractionSchema::for_url("https://www.linkedin.com/in/alice"),
            ExtractionSchema::ProfessionalProfile
        );
        assert_eq!(
            ExtractionSchema::for_url("https://alice.dev/projects"),
            ExtractionSchema::Portfolio
        );
        assert_eq!(ExtractionSchema::for_url("not a url"), ExtractionSchema::Portfolio);
    }

    #[test]
    fn prompts_embed_inputs() {
        let links = vec![RankedLink {
            text: "Projects".into(),
            href: "https://alice.dev/projects".into(),
            priority: LinkPriority::High,
        }];
        let p = select_links("Full Resume Audit", &links);
        assert!(p.contains("Full Resume Audit"));
        assert!(p.contains(r#""priority":"high""#));
        assert!(p.contains("selected_urls"));

        let p = classify("https://alice.dev", "goal", "Hello there", &links);
        assert!(p.contains("Hello there"));
        assert!(p.contains("target_urls"));

        let p = extract("goal", "https://github.com/alice/app", "README", ExtractionSchema::Repository);
        assert!(p.contains("repo_link"));
        assert!(p.contains("README"));
    }
}
