//! Crawl frontier: pending queue, visited set, and the current batch.
//!
//! Visited URLs are recorded in first-visit order. Newly discovered links
//! are prepended so detail pages found in a batch are explored before the
//! rest of the seeded frontier.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use footprint_crawler::is_useful;

#[derive(Debug, Clone)]
pub struct Frontier {
    queue: VecDeque<String>,
    visited: Vec<String>,
    seen: HashSet<String>,
    current_batch: Vec<String>,
    batch_size: usize,
}

impl Frontier {
    pub fn new(batch_size: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: Vec::new(),
            seen: HashSet::new(),
            current_batch: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Record a URL as visited without queueing it (the audit root).
    pub fn mark_visited(&mut self, url: &str) -> bool {
        if self.seen.insert(url.to_string()) {
            self.visited.push(url.to_string());
            true
        } else {
            false
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Append URLs to the back of the queue, skipping visited and queued ones.
    pub fn seed<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            let url = url.into();
            if !self.is_visited(&url) && !self.queue.contains(&url) {
                self.queue.push_back(url);
            }
        }
    }

    /// Drain up to `batch_size` unvisited URLs from the front of the queue
    /// and mark them visited.
    ///
    /// Returns the new batch; an empty batch means the frontier is exhausted,
    /// in which case any leftover (already visited) entries are discarded.
    pub fn dispatch(&mut self) -> &[String] {
        self.current_batch.clear();
        while self.current_batch.len() < self.batch_size {
            let Some(url) = self.queue.pop_front() else {
                break;
            };
            if self.mark_visited(&url) {
                self.current_batch.push(url);
            }
        }

        if self.current_batch.is_empty() {
            self.queue.clear();
        }
        debug!(batch = ?self.current_batch, queued = self.queue.len(), "dispatch");
        &self.current_batch
    }

    /// Filter discovered links and prepend the survivors, preserving their
    /// relative order. Returns how many were added.
    pub fn enqueue_discovered<I, S>(&mut self, links: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fresh: Vec<String> = Vec::new();
        for link in links {
            let link = link.as_ref();
            if !is_useful(link)
                || self.is_visited(link)
                || self.queue.iter().any(|q| q == link)
                || fresh.iter().any(|f| f == link)
            {
                continue;
            }
            fresh.push(link.to_string());
        }

        let added = fresh.len();
        for url in fresh.into_iter().rev() {
            self.queue.push_front(url);
        }
        added
    }

    /// URLs in first-visit order.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn queue(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
