//! Scoped search state and client-side highlighting of search hits.

use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::Arc;

use super::{CoreError, Entry, ListingCache, Separator};

/// A run of text that either matches the query or does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSegment {
    pub text: String,
    pub is_match: bool,
}

/// A search result decorated for display.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub entry: Entry,
    pub name: Vec<HighlightSegment>,
    /// One highlighted run list per path segment.
    pub path: Vec<Vec<HighlightSegment>>,
}

/// What the engine decided before any request is made.
#[derive(Debug, Clone)]
pub enum SearchLookup {
    /// Blank query: results were cleared, nothing to send.
    Empty,
    /// Answered from the cache; results now point at the cached list.
    Cached(Arc<Vec<Entry>>),
    /// A request to the service is required.
    Miss,
}

/// Holds the query, the current result list and the result cache.
///
/// The cache lives as long as the engine: navigation resets the query and
/// results but keeps cached lists.
#[derive(Debug, Default)]
pub struct SearchEngine {
    cache: ListingCache,
    query: String,
    results: Arc<Vec<Entry>>,
    is_searching: bool,
}

impl SearchEngine {
    pub fn new(scope_cache_to_path: bool) -> Self {
        Self {
            cache: ListingCache::new(scope_cache_to_path),
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn results(&self) -> &Arc<Vec<Entry>> {
        &self.results
    }

    pub fn is_searching(&self) -> bool {
        self.is_searching
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    /// Resolves `query` against local state. On [`SearchLookup::Miss`] the
    /// engine is marked as searching and the caller must issue the request.
    pub fn lookup(&mut self, path: &str, query: &str) -> SearchLookup {
        if query.trim().is_empty() {
            self.results = Arc::new(Vec::new());
            self.is_searching = false;
            return SearchLookup::Empty;
        }
        if let Some(cached) = self.cache.get(path, query) {
            tracing::debug!("Search cache hit for {:?}", query);
            self.results = Arc::clone(&cached);
            self.is_searching = false;
            return SearchLookup::Cached(cached);
        }
        self.is_searching = true;
        SearchLookup::Miss
    }

    /// Applies the service's answer for `query`.
    ///
    /// Successful results are cached and become the current results. Errors,
    /// throttling included, leave both the results and the cache untouched.
    pub fn complete(
        &mut self,
        path: &str,
        query: &str,
        outcome: Result<Vec<Entry>, CoreError>,
    ) -> Result<Arc<Vec<Entry>>, CoreError> {
        self.is_searching = false;
        let results = outcome?;
        let stored = self.cache.insert(path, query, results);
        self.results = Arc::clone(&stored);
        Ok(stored)
    }

    /// Clears the query and the visible results, keeping the cache.
    pub fn reset(&mut self) {
        self.query.clear();
        self.results = Arc::new(Vec::new());
        self.is_searching = false;
    }

    /// Highlights the current results against the current query.
    pub fn decorated(&self, separator: Separator) -> Vec<SearchHit> {
        decorate_results(&self.results, &self.query, separator)
    }
}

fn build_matcher(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into matching and non-matching runs, case-insensitively.
pub fn highlight(text: &str, query: &str) -> Vec<HighlightSegment> {
    match build_matcher(query) {
        Some(matcher) => highlight_with(&matcher, text),
        None => plain(text),
    }
}

fn plain(text: &str) -> Vec<HighlightSegment> {
    if text.is_empty() {
        return Vec::new();
    }
    vec![HighlightSegment {
        text: text.to_string(),
        is_match: false,
    }]
}

fn highlight_with(matcher: &Regex, text: &str) -> Vec<HighlightSegment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for found in matcher.find_iter(text) {
        if found.start() > last {
            segments.push(HighlightSegment {
                text: text[last..found.start()].to_string(),
                is_match: false,
            });
        }
        segments.push(HighlightSegment {
            text: found.as_str().to_string(),
            is_match: true,
        });
        last = found.end();
    }
    if last < text.len() {
        segments.push(HighlightSegment {
            text: text[last..].to_string(),
            is_match: false,
        });
    }
    segments
}

/// Decorates raw results with highlighted names and path segments.
pub fn decorate_results(results: &[Entry], query: &str, separator: Separator) -> Vec<SearchHit> {
    let matcher = build_matcher(query);
    let mark = |text: &str| match &matcher {
        Some(m) => highlight_with(m, text),
        None => plain(text),
    };

    results
        .par_iter()
        .map(|entry| SearchHit {
            entry: entry.clone(),
            name: mark(&entry.name),
            path: entry
                .path
                .split(separator.as_char())
                .map(|segment| mark(segment))
                .collect(),
        })
        .collect()
}
