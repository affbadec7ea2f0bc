use crate::error::{Result, ScanError};
use crate::fetch::{HttpFetcher, PageFetcher, extract_hrefs};
use crate::page_url::PageUrl;
use crate::result::{CrawlReport, PageFailure};
use crate::site::{EvictionPolicy, PageId, SiteGraph};
use crate::validator::LinkValidator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Token pool size used when the operator does not ask for less.
pub const DEFAULT_CONCURRENCY: usize = 10_000;

/// Called after each page task finishes with the number of pages done so far
/// and the URL of the page that just finished.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub struct Crawler<F: PageFetcher = HttpFetcher> {
    fetcher: Arc<F>,
    concurrency_limit: usize,
    eviction: EvictionPolicy,
    verbose: bool,
    deadline: Option<Duration>,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler<HttpFetcher> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new()?))
    }
}

impl<F: PageFetcher> Crawler<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            concurrency_limit: DEFAULT_CONCURRENCY,
            eviction: EvictionPolicy::default(),
            verbose: false,
            deadline: None,
            cancel: CancellationToken::new(),
            progress_callback: None,
        }
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Stop the whole crawl once `deadline` has elapsed since it started.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancel the crawl from outside by cancelling `token`.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawl every in-scope page reachable from `entry`.
    ///
    /// Always returns a report: per-page failures are collected, and a
    /// cancelled crawl reports the graph as far as it got.
    pub async fn crawl(&self, entry: PageUrl) -> CrawlReport {
        let started = Instant::now();
        info!(
            "Starting crawl of {} with {} concurrency tokens",
            entry, self.concurrency_limit
        );

        let site = Arc::new(SiteGraph::new(entry.clone()).with_eviction_policy(self.eviction));
        let cancel = self.cancel.child_token();

        let ctx = Arc::new(PageTask {
            fetcher: self.fetcher.clone(),
            site: site.clone(),
            validator: LinkValidator::new(entry.clone()),
            tokens: Semaphore::new(self.concurrency_limit),
            cancel: cancel.clone(),
        });

        let deadline_timer = self.deadline.map(|deadline| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                info!("Crawl deadline of {:?} reached, cancelling", deadline);
                cancel.cancel();
            })
        });

        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        let root = tasks.spawn(ctx.clone().run(site.root(), entry.clone()));
        in_flight.insert(root.id(), entry);

        let mut completed = 0;
        let mut pages_fetched = 0;
        let mut evicted = Vec::new();
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, outcome)) => {
                    in_flight.remove(&id);
                    outcome
                }
                Err(e) => {
                    completed += 1;
                    let url = in_flight
                        .remove(&e.id())
                        .map(|url| url.to_string())
                        .unwrap_or_default();
                    let error = ScanError::from(e);
                    warn!("Page task for {} failed: {}", url, error);
                    failures.push(PageFailure {
                        url,
                        error: error.to_string(),
                    });
                    continue;
                }
            };
            completed += 1;

            match outcome.result {
                Ok(children) => {
                    pages_fetched += 1;
                    debug!(
                        "Crawled {} ({} new pages, {} in flight)",
                        outcome.url,
                        children.len(),
                        tasks.len()
                    );
                    if !cancel.is_cancelled() {
                        for (page, url) in children {
                            let handle = tasks.spawn(ctx.clone().run(page, url.clone()));
                            in_flight.insert(handle.id(), url);
                        }
                    }
                }
                Err(ScanError::UnsupportedContentType { url, content_type }) => {
                    pages_fetched += 1;
                    debug!("Evicted {} (content type '{}')", url, content_type);
                    evicted.push(url);
                }
                Err(ScanError::Cancelled) => {
                    trace!("Page {} cancelled", outcome.url);
                }
                Err(e) => {
                    if self.verbose {
                        warn!("Crawl error for {}: {}", outcome.url, e);
                    } else {
                        debug!("Crawl error for {}: {}", outcome.url, e);
                    }
                    failures.push(PageFailure {
                        url: outcome.url.to_string(),
                        error: e.to_string(),
                    });
                }
            }

            if let Some(ref callback) = self.progress_callback {
                callback(completed, outcome.url.to_string());
            }
        }

        if let Some(timer) = deadline_timer {
            timer.abort();
        }

        let cancelled = cancel.is_cancelled();
        let snapshot = site.snapshot().await;
        let duration = started.elapsed();

        info!(
            "Crawl complete. {} pages in {:?}{}",
            snapshot.total_pages,
            duration,
            if cancelled { " (cancelled)" } else { "" }
        );

        CrawlReport {
            site: snapshot,
            duration,
            pages_fetched,
            evicted,
            failures,
            cancelled,
        }
    }
}

/// Shared state every page task works against.
struct PageTask<F> {
    fetcher: Arc<F>,
    site: Arc<SiteGraph>,
    validator: LinkValidator,
    tokens: Semaphore,
    cancel: CancellationToken,
}

struct PageOutcome {
    url: PageUrl,
    result: Result<Vec<(PageId, PageUrl)>>,
}

impl<F: PageFetcher> PageTask<F> {
    async fn run(self: Arc<Self>, page: PageId, url: PageUrl) -> PageOutcome {
        let result = self.crawl_page(page, &url).await;
        PageOutcome { url, result }
    }

    /// Fetch one page and reserve its unseen links. Returns the pages that
    /// still need a task of their own.
    async fn crawl_page(&self, page: PageId, url: &PageUrl) -> Result<Vec<(PageId, PageUrl)>> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ScanError::Cancelled),
            permit = self.tokens.acquire() => permit.map_err(|_| ScanError::Cancelled)?,
        };

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ScanError::Cancelled),
            fetched = self.fetcher.fetch(url) => fetched?,
        };

        if !fetched.is_html() {
            self.site.evict(page).await;
            return Err(ScanError::UnsupportedContentType {
                url: url.to_string(),
                content_type: fetched.content_type,
            });
        }
        self.site.mark_crawled(page).await;

        let mut accepted: Vec<PageUrl> = Vec::new();
        let mut children = Vec::new();

        for href in extract_hrefs(&fetched.body) {
            let link = match self.validator.validate(&href, url, &accepted) {
                Ok(link) => link,
                Err(reason) => {
                    trace!("Skipping '{}' on {}: {}", href, url, reason);
                    continue;
                }
            };

            self.site.record_edge(page, &link).await;
            match self.site.try_reserve(page, &link).await {
                Some(child) => children.push((child, link.clone())),
                None => trace!("{} already reserved", link),
            }
            accepted.push(link);
        }

        Ok(children)
    }
}
