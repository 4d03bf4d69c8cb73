//! OpenAI-compatible chat-completion oracle (OpenRouter by default).

use std::sync::LazyLock;

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use footprint_crawler::{RankedLink, rank_links};
use footprint_shared::{
    Category, FieldMap, FootprintError, Item, Link, OracleConfig, ProfileFragment, Result,
};

use super::prompts::{self, ExtractionSchema};
use super::review::{CODE_REVIEW_JUDGES, JUDGE_CONTENT_CHARS, aggregate_reviews};
use super::{
    CLASSIFY_LINK_LIMIT, CLASSIFY_PREVIEW_CHARS, Decision, EXTRACT_CONTENT_CHARS, Oracle,
    clean_fragment, truncate_chars,
};
use crate::merge::fragment_from_value;
use crate::retry::{FailureKind, RetryConfig};

/// Title sent with every request.
const APP_TITLE: &str = "footprint";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// A failed attempt and how to back off from it.
#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    error: FootprintError,
}

impl Failure {
    fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            error: FootprintError::Oracle(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Oracle backed by a chat-completion endpoint returning JSON objects.
pub struct OpenRouterOracle {
    client: Client,
    config: OracleConfig,
    retry: RetryConfig,
    permits: Semaphore,
}

impl OpenRouterOracle {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FootprintError::Network(format!("failed to build HTTP client: {e}")))?;

        info!(model = %config.model, base_url = %config.base_url, "oracle ready");
        Ok(Self {
            client,
            retry: RetryConfig::from(&config),
            permits: Semaphore::new(config.max_concurrent_requests.max(1)),
            config,
        })
    }

    /// Send `prompt` and return the reply's JSON object.
    ///
    /// Retries with backoff; after the last attempt an empty map is returned.
    async fn call_json(&self, purpose: &'static str, prompt: &str) -> FieldMap {
        let Ok(_permit) = self.permits.acquire().await else {
            return FieldMap::new();
        };

        for attempt in 0..self.retry.max_attempts {
            match self.attempt(prompt).await {
                Ok(map) => {
                    debug!(purpose, attempt, keys = map.len(), "oracle reply");
                    return map;
                }
                Err(failure) => {
                    if !self.retry.should_retry(attempt) {
                        warn!(purpose, attempt, error = %failure.error, "oracle attempt failed");
                        break;
                    }
                    let delay = self.retry.delay_for(attempt, failure.kind);
                    warn!(
                        purpose,
                        attempt,
                        error = %failure.error,
                        delay_ms = delay.as_millis() as u64,
                        "oracle attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        error!(purpose, attempts = self.retry.max_attempts, "oracle call exhausted retries");
        FieldMap::new()
    }

    async fn attempt(&self, prompt: &str) -> std::result::Result<FieldMap, Failure> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|e| Failure::transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Failure {
                kind: FailureKind::RateLimited,
                error: FootprintError::Oracle("rate limited (429)".into()),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Failure::transient(format!(
                "HTTP {status}: {}",
                truncate_chars(&text, 200)
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| Failure::transient(format!("malformed response body: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Failure::transient("response has no content"))?;

        parse_reply(&content).ok_or_else(|| Failure::transient("reply is not a JSON object"))
    }

    /// Run the judges concurrently and fold their scores into one record.
    async fn review_code(&self, content: &str, url: &str) -> ProfileFragment {
        let prompt = prompts::code_review(truncate_chars(content, JUDGE_CONTENT_CHARS));
        let replies = join_all(
            (0..CODE_REVIEW_JUDGES).map(|_| self.call_json("code_review", &prompt)),
        )
        .await;

        let answered = replies.iter().filter(|r| !r.is_empty()).count();
        if answered < CODE_REVIEW_JUDGES {
            warn!(answered, judges = CODE_REVIEW_JUDGES, "some judges gave no review");
        }

        let (loc, complexity) = static_metrics(content);
        let review = Item::from(aggregate_reviews(&replies))
            .with("loc", loc)
            .with("complexity_proxy", complexity)
            .with("file_name", file_name(url));

        let mut fragment = ProfileFragment::new();
        fragment.push_items(Category::CodeReviews, vec![review]);
        fragment
    }
}

#[async_trait]
impl Oracle for OpenRouterOracle {
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    async fn select_links(
        &self,
        goal: &str,
        candidates: &[RankedLink],
        root_url: &str,
    ) -> Vec<String> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let reply = self
            .call_json("select_links", &prompts::select_links(goal, candidates))
            .await;

        let selected: Vec<String> = match reply.get("selected_urls") {
            Some(Value::Array(urls)) => urls
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|u| !u.is_empty() && *u != root_url)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };
        info!(selected = selected.len(), "navigation plan");
        selected
    }

    #[instrument(skip_all, fields(%url))]
    async fn classify(
        &self,
        url: &str,
        content: &str,
        links: &[Link],
        goal: &str,
        root_url: &str,
    ) -> Decision {
        let described: Vec<Link> = links
            .iter()
            .filter(|l| l.text.trim().chars().count() > 3)
            .cloned()
            .collect();
        let shortlist = rank_links(&described, root_url, CLASSIFY_LINK_LIMIT);
        let preview = truncate_chars(content, CLASSIFY_PREVIEW_CHARS);

        let reply = self
            .call_json("classify", &prompts::classify(url, goal, preview, &shortlist))
            .await;
        let decision = Decision::from_value(&Value::Object(reply));
        debug!(action = decision.action.as_str(), targets = decision.target_urls.len(), "decision");
        decision
    }

    #[instrument(skip_all, fields(%url))]
    async fn extract(&self, content: &str, goal: &str, url: &str) -> ProfileFragment {
        let content = truncate_chars(content, EXTRACT_CONTENT_CHARS);
        let schema = ExtractionSchema::for_url(url);
        if schema == ExtractionSchema::CodeReview {
            return self.review_code(content, url).await;
        }

        let reply = self
            .call_json("extract", &prompts::extract(goal, url, content, schema))
            .await;
        let fragment = clean_fragment(fragment_from_value(Value::Object(reply)));
        debug!(items = fragment.item_count(), "extracted");
        fragment
    }
}

// ---------------------------------------------------------------------------
// Reply handling
// ---------------------------------------------------------------------------

/// Unwrap a Markdown code fence (if any) and parse a JSON object.
fn parse_reply(content: &str) -> Option<FieldMap> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid regex")
    });

    let body = FENCE_RE
        .captures(content)
        .and_then(|c| c.get(1))
        .map_or(content, |m| m.as_str())
        .trim();

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Last path segment of a URL (the file name of a source view).
fn file_name(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

/// Non-blank line count and indented-line count.
fn static_metrics(content: &str) -> (usize, usize) {
    let loc = content.lines().filter(|l| !l.trim().is_empty()).count();
    let indented = content
        .lines()
        .filter(|l| l.starts_with("    ") || l.starts_with('\t'))
        .count();
    (loc, indented)
}
