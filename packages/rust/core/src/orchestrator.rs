//! Audit orchestrator: the `INIT → DISPATCH ⇄ SCRAPE → DONE` state machine.
//!
//! One [`Auditor`] run owns the frontier and the running profile; both are
//! mutated only between batches. URLs within a batch are processed
//! concurrently and their fragments combined in batch order, so the result
//! does not depend on completion order.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use footprint_crawler::{FetchPath, PageFetcher, is_source_code, is_useful, rank_links};
use footprint_shared::{
    AuditConfig, FootprintError, Link, PORTFOLIO_URL, Profile, ProfileFragment, Result,
};

use crate::frontier::Frontier;
use crate::merge::merge_profile;
use crate::oracle::{Decision, Oracle, PageAction};

/// Candidate links shown to the oracle when planning from the root page.
pub const ROOT_LINK_LIMIT: usize = 60;

/// Why an audit stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No unvisited URL was left.
    FrontierExhausted,
    /// The step ceiling was reached with work still queued.
    StepLimit,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontierExhausted => "frontier exhausted",
            Self::StepLimit => "step limit",
        }
    }
}

/// Result of a completed audit.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub profile: Profile,
    /// URLs in first-visit order, root first.
    pub visited: Vec<String>,
    /// State-machine steps executed.
    pub steps: u32,
    pub stop_reason: StopReason,
    pub elapsed: std::time::Duration,
}

/// Progress callback for audit runs.
pub trait AuditProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a URL has been fetched and classified.
    fn page_processed(&self, url: &str, action: PageAction, visited: usize);
    /// Called once the audit completes.
    fn done(&self, outcome: &AuditOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl AuditProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_processed(&self, _url: &str, _action: PageAction, _visited: usize) {}
    fn done(&self, _outcome: &AuditOutcome) {}
}

#[derive(Debug)]
enum AuditState {
    Init,
    Dispatch,
    Scrape(Vec<String>),
    Done(StopReason),
}

/// What processing one URL produced.
#[derive(Debug, Default)]
struct PageResult {
    fragment: ProfileFragment,
    discovered: Vec<String>,
    action: Option<PageAction>,
}

/// Runs audits against a fetcher and an oracle.
pub struct Auditor {
    fetcher: Arc<dyn PageFetcher>,
    oracle: Arc<dyn Oracle>,
    config: AuditConfig,
}

impl Auditor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, oracle: Arc<dyn Oracle>, config: AuditConfig) -> Self {
        Self {
            fetcher,
            oracle,
            config,
        }
    }

    /// Audit `start_url`. The fetcher is shut down before returning, on
    /// success and on failure.
    #[instrument(skip_all, fields(start_url = %start_url, goal = %self.config.goal))]
    pub async fn run(&self, start_url: &str, progress: &dyn AuditProgress) -> Result<AuditOutcome> {
        let result = self.drive(start_url, progress).await;
        self.fetcher.shutdown().await;

        if let Ok(outcome) = &result {
            info!(
                visited = outcome.visited.len(),
                items = outcome.profile.item_count(),
                steps = outcome.steps,
                stop = outcome.stop_reason.as_str(),
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "audit complete"
            );
            progress.done(outcome);
        }
        result
    }

    async fn drive(&self, start_url: &str, progress: &dyn AuditProgress) -> Result<AuditOutcome> {
        let started = Instant::now();
        // Links come back in `Url` serialized form; the root must match it.
        let start_url = canonical_url(start_url)?;
        let start_url = start_url.as_str();
        let mut frontier = Frontier::new(self.config.batch_size);
        let mut profile = Profile::new();
        let mut steps: u32 = 0;
        let mut state = AuditState::Init;

        loop {
            // INIT always runs; the ceiling applies to everything after it.
            let limited = steps >= self.config.max_steps && !matches!(state, AuditState::Init);
            if limited && !matches!(state, AuditState::Done(_)) {
                warn!(steps, max_steps = self.config.max_steps, "step limit reached");
                state = AuditState::Done(StopReason::StepLimit);
            }

            state = match state {
                AuditState::Init => {
                    steps += 1;
                    progress.phase("Planning");
                    self.init(start_url, &mut frontier, &mut profile).await?;
                    AuditState::Dispatch
                }
                AuditState::Dispatch => {
                    steps += 1;
                    let batch = frontier.dispatch().to_vec();
                    if batch.is_empty() {
                        AuditState::Done(StopReason::FrontierExhausted)
                    } else {
                        info!(batch = ?batch, remaining = frontier.queue_len(), "dispatch");
                        AuditState::Scrape(batch)
                    }
                }
                AuditState::Scrape(batch) => {
                    steps += 1;
                    progress.phase(&format!("Scraping {} URL(s)", batch.len()));
                    self.scrape(&batch, start_url, &mut frontier, &mut profile, progress)
                        .await;
                    AuditState::Dispatch
                }
                AuditState::Done(stop_reason) => {
                    return Ok(AuditOutcome {
                        profile,
                        visited: frontier.visited().to_vec(),
                        steps,
                        stop_reason,
                        elapsed: started.elapsed(),
                    });
                }
            };
        }
    }

    /// Fetch and extract the root, then seed the frontier from its links.
    async fn init(&self, start_url: &str, frontier: &mut Frontier, profile: &mut Profile) -> Result<()> {
        let page = self.fetcher.fetch(start_url).await;
        if !page.success() {
            return Err(FootprintError::RootUnreachable {
                url: start_url.to_string(),
            });
        }
        frontier.mark_visited(start_url);

        let root_fragment = self
            .oracle
            .extract(&page.content, &self.config.goal, start_url)
            .await;
        debug!(items = root_fragment.item_count(), "root extraction");

        let useful: Vec<Link> = page
            .links
            .iter()
            .filter(|l| is_useful(&l.href))
            .cloned()
            .collect();
        let candidates = rank_links(&useful, start_url, ROOT_LINK_LIMIT);
        info!(found = page.links.len(), useful = useful.len(), candidates = candidates.len(), "planning");

        let targets: Vec<String> = self
            .oracle
            .select_links(&self.config.goal, &candidates, start_url)
            .await
            .into_iter()
            .filter_map(|t| resolve(start_url, &t))
            .filter(|t| t != start_url && is_useful(t))
            .collect();
        info!(missions = ?targets, "selected missions");
        frontier.seed(targets);

        profile
            .scalars
            .insert(PORTFOLIO_URL.to_string(), Value::String(start_url.to_string()));
        merge_profile(profile, root_fragment);
        Ok(())
    }

    /// Process a batch concurrently, then merge and enqueue in batch order.
    async fn scrape(
        &self,
        batch: &[String],
        root_url: &str,
        frontier: &mut Frontier,
        profile: &mut Profile,
        progress: &dyn AuditProgress,
    ) {
        let results = join_all(batch.iter().map(|url| self.process(url, root_url))).await;

        let mut combined = ProfileFragment::new();
        let mut discovered = Vec::new();
        for (url, result) in batch.iter().zip(results) {
            if let Some(action) = result.action {
                progress.page_processed(url, action, frontier.visited().len());
            }
            combined.absorb(result.fragment);
            discovered.extend(result.discovered);
        }

        let stats = merge_profile(profile, combined);
        let queued = frontier.enqueue_discovered(&discovered);
        info!(
            added = stats.added,
            merged = stats.merged,
            discovered = discovered.len(),
            queued,
            "merge"
        );
    }

    /// Fetch → classify → (maybe) extract for a single URL. Never fails.
    async fn process(&self, url: &str, root_url: &str) -> PageResult {
        let goal = &self.config.goal;
        let page = self.fetcher.fetch(url).await;
        match page.path {
            FetchPath::Failed => {
                debug!(%url, "fetch failed, no contribution");
                return PageResult::default();
            }
            path => debug!(%url, ?path, len = page.content.len(), "fetched"),
        }

        let decision = if is_source_code(url) {
            Decision::extract()
        } else {
            let links: Vec<Link> = match page.path {
                FetchPath::Rendered => page
                    .links
                    .iter()
                    .filter(|l| is_useful(&l.href))
                    .cloned()
                    .collect(),
                _ => Vec::new(),
            };
            self.oracle
                .classify(url, &page.content, &links, goal, root_url)
                .await
        };
        info!(%url, action = decision.action.as_str(), "decision");

        let mut result = PageResult {
            action: Some(decision.action),
            ..PageResult::default()
        };
        match decision.action {
            PageAction::Navigate => {
                result.discovered = decision
                    .target_urls
                    .iter()
                    .filter_map(|t| resolve(url, t))
                    .collect();
            }
            PageAction::Extract => {
                result.fragment = self.oracle.extract(&page.content, goal, url).await;
            }
            PageAction::Skip => {}
        }
        result
    }
}

/// Audit `start_url` with default settings other than `goal` and
/// `max_steps`, returning only the profile.
pub async fn run_audit(
    fetcher: Arc<dyn PageFetcher>,
    oracle: Arc<dyn Oracle>,
    start_url: &str,
    goal: &str,
    max_steps: u32,
) -> Result<Profile> {
    let config = AuditConfig {
        goal: goal.to_string(),
        max_steps,
        ..AuditConfig::default()
    };
    let outcome = Auditor::new(fetcher, oracle, config)
        .run(start_url, &SilentProgress)
        .await?;
    Ok(outcome.profile)
}

/// Serialize `url` the way [`Url`] does, so `https://a.dev` and
/// `https://a.dev/` are the same key.
fn canonical_url(url: &str) -> Result<String> {
    Url::parse(url.trim())
        .map(|u| u.to_string())
        .map_err(|e| FootprintError::validation(format!("invalid start URL '{url}': {e}")))
}

/// Resolve a possibly relative target against the page it came from.
fn resolve(base: &str, target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    match Url::parse(target) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)
            .and_then(|b| b.join(target))
            .ok()
            .map(|u| u.to_string()),
        Err(_) => None,
    }
}
