use crate::site::SiteMap;
use serde::Serialize;
use std::time::Duration;

/// A page whose crawl failed. Failures never abort sibling pages.
#[derive(Debug, Clone, Serialize)]
pub struct PageFailure {
    pub url: String,
    pub error: String,
}

/// Everything a finished crawl hands to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub site: SiteMap,
    pub duration: Duration,
    /// Pages that completed a fetch, HTML or not.
    pub pages_fetched: usize,
    /// Pages dropped from the map because they were not HTML.
    pub evicted: Vec<String>,
    pub failures: Vec<PageFailure>,
    /// True when the crawl stopped early on cancellation or deadline.
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn total_pages(&self) -> usize {
        self.site.total_pages
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled
    }
}
