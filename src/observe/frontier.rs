//! Bounded FIFO frontier for same-origin page discovery.
//!
//! The frontier dedups visited URLs, caps both page count and depth, and
//! drops new links once the hard queue cap is reached. External and
//! dynamic-route URLs never enter the queue; they are recorded as skips.

use std::collections::{BTreeSet, VecDeque};

use url::Url;

use crate::types::{ObservationReason, SkipEntry, is_dynamic_route};

#[derive(Debug, Clone)]
struct QueuedUrl {
    url: String,
    depth: usize,
}

/// The traversal frontier.
#[derive(Debug)]
pub struct Frontier {
    base_host: String,
    queue: VecDeque<QueuedUrl>,
    seen: BTreeSet<String>,
    visited: usize,
    max_pages: usize,
    max_depth: usize,
    cap: usize,
    skips: Vec<SkipEntry>,
    dropped: usize,
}

impl Frontier {
    #[must_use]
    pub fn new(base: &Url, max_pages: usize, max_depth: usize, cap: usize) -> Self {
        let mut frontier = Self {
            base_host: base.host_str().unwrap_or_default().to_string(),
            queue: VecDeque::new(),
            seen: BTreeSet::new(),
            visited: 0,
            max_pages,
            max_depth,
            cap,
            skips: Vec::new(),
            dropped: 0,
        };
        frontier.seen.insert(base.as_str().to_string());
        frontier.queue.push_back(QueuedUrl {
            url: base.as_str().to_string(),
            depth: 0,
        });
        frontier
    }

    /// Offer a discovered link at the given depth.
    pub fn offer(&mut self, base: &Url, raw: &str, depth: usize) {
        let Ok(resolved) = base.join(raw) else {
            return;
        };
        let url = resolved.as_str().to_string();

        if resolved.host_str().unwrap_or_default() != self.base_host {
            self.skips.push(SkipEntry {
                reason: ObservationReason::ExternalUrlSkipped,
                value: url,
                expectation_id: None,
            });
            return;
        }
        if is_dynamic_route(resolved.path()) {
            self.skips.push(SkipEntry {
                reason: ObservationReason::OutOfScopeDynamicRoute,
                value: url,
                expectation_id: None,
            });
            return;
        }
        if self.seen.contains(&url) {
            return;
        }
        if depth > self.max_depth {
            return;
        }
        if self.queue.len() >= self.cap {
            // Hard cap: links beyond it are dropped, silently but counted.
            self.dropped += 1;
            return;
        }
        self.seen.insert(url.clone());
        self.queue.push_back(QueuedUrl { url, depth });
    }

    /// Next URL to visit, respecting the page cap.
    pub fn next(&mut self) -> Option<(String, usize)> {
        if self.visited >= self.max_pages {
            return None;
        }
        let entry = self.queue.pop_front()?;
        self.visited += 1;
        Some((entry.url, entry.depth))
    }

    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited
    }

    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// Skip entries accumulated during discovery, in discovery order.
    #[must_use]
    pub fn into_skips(self) -> Vec<SkipEntry> {
        self.skips
    }
}
