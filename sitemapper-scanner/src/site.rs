use crate::page_url::{PageUrl, trailing_slash_variants};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

/// Handle to a page node in the site tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(usize);

/// What happens to a page's tree node when its map entry is evicted because
/// the page turned out not to be HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Detach the node from its parent so the tree and map agree.
    #[default]
    Prune,
    /// Keep the node in the tree; only the map entry goes away.
    Retain,
}

/// Snapshot of one page in the rooted site tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub url: String,
    #[serde(rename = "total_links")]
    pub link_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Page>,
}

impl Page {
    /// Every URL in this subtree, depth first.
    pub fn urls(&self) -> Vec<&str> {
        let mut out = vec![self.url.as_str()];
        for child in &self.links {
            out.extend(child.urls());
        }
        out
    }
}

/// Owned, lock-free copy of a finished site graph.
#[derive(Debug, Clone, Serialize)]
pub struct SiteMap {
    pub entry_url: String,
    pub total_pages: usize,
    pub visited: BTreeMap<String, Vec<String>>,
    pub root: Page,
}

#[derive(Debug)]
struct PageNode {
    url: PageUrl,
    parent: Option<PageId>,
    children: Vec<PageId>,
    link_count: usize,
}

#[derive(Debug, Default)]
struct VisitEntry {
    links: Vec<String>,
    crawled: bool,
}

#[derive(Debug)]
struct GraphState {
    visited: HashMap<String, VisitEntry>,
    evicted: HashSet<String>,
    pages: Vec<PageNode>,
    total_pages: usize,
}

impl GraphState {
    fn visited_key(&self, url: &str) -> Option<String> {
        trailing_slash_variants(url)
            .into_iter()
            .find(|variant| self.visited.contains_key(variant))
    }

    fn ever_reserved(&self, url: &str) -> bool {
        trailing_slash_variants(url)
            .iter()
            .any(|v| self.visited.contains_key(v) || self.evicted.contains(v))
    }

    fn adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.visited
            .iter()
            .map(|(url, entry)| (url.clone(), entry.links.clone()))
            .collect()
    }

    fn build_page(&self, id: PageId) -> Page {
        let node = &self.pages[id.0];
        Page {
            url: node.url.to_string(),
            link_count: node.link_count,
            links: node.children.iter().map(|c| self.build_page(*c)).collect(),
        }
    }
}

/// The shared crawl aggregate: adjacency map plus page tree.
///
/// All state sits behind one mutex and is only changed through the methods
/// below, each of which is a single critical section.
#[derive(Debug)]
pub struct SiteGraph {
    entry_url: PageUrl,
    eviction: EvictionPolicy,
    guard: Mutex<GraphState>,
}

impl SiteGraph {
    /// Create a graph whose root page is `entry_url`, already reserved.
    pub fn new(entry_url: PageUrl) -> Self {
        let mut visited = HashMap::new();
        visited.insert(entry_url.to_string(), VisitEntry::default());

        let root = PageNode {
            url: entry_url.clone(),
            parent: None,
            children: Vec::new(),
            link_count: 0,
        };

        Self {
            entry_url,
            eviction: EvictionPolicy::default(),
            guard: Mutex::new(GraphState {
                visited,
                evicted: HashSet::new(),
                pages: vec![root],
                total_pages: 0,
            }),
        }
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    pub fn root(&self) -> PageId {
        PageId(0)
    }

    /// Reserve `url` for crawling and hang a new page for it under `parent`.
    ///
    /// Returns `None` when the URL, or its trailing-slash twin, has been
    /// reserved before, even if it was evicted since. Check and insert happen
    /// under one lock acquisition.
    pub async fn try_reserve(&self, parent: PageId, url: &PageUrl) -> Option<PageId> {
        let mut state = self.guard.lock().await;

        if state.ever_reserved(url.as_str()) {
            return None;
        }

        state
            .visited
            .insert(url.to_string(), VisitEntry::default());

        let id = PageId(state.pages.len());
        state.pages.push(PageNode {
            url: url.clone(),
            parent: Some(parent),
            children: Vec::new(),
            link_count: 0,
        });
        state.pages[parent.0].children.push(id);

        Some(id)
    }

    /// Append `child` to the edge list of `parent` and count the link.
    pub async fn record_edge(&self, parent: PageId, child: &PageUrl) {
        let mut state = self.guard.lock().await;
        let key = state.pages[parent.0].url.to_string();

        if let Some(entry) = state.visited.get_mut(&key) {
            entry.links.push(child.to_string());
        }
        state.pages[parent.0].link_count += 1;
    }

    /// Count `page` as a crawled HTML page. Returns false if it was already
    /// counted or is no longer in the map.
    pub async fn mark_crawled(&self, page: PageId) -> bool {
        let mut state = self.guard.lock().await;
        let key = state.pages[page.0].url.to_string();

        let newly_counted = match state.visited.get_mut(&key) {
            Some(entry) if !entry.crawled => {
                entry.crawled = true;
                true
            }
            _ => false,
        };
        if newly_counted {
            state.total_pages += 1;
        }
        newly_counted
    }

    /// Drop `page` from the map, uncounting it if needed, and apply the
    /// eviction policy to its tree node. Returns false if it was not mapped.
    pub async fn evict(&self, page: PageId) -> bool {
        let mut state = self.guard.lock().await;
        let key = state.pages[page.0].url.to_string();

        let Some(entry) = state.visited.remove(&key) else {
            return false;
        };
        if entry.crawled {
            state.total_pages -= 1;
        }
        state.evicted.insert(key);

        if self.eviction == EvictionPolicy::Prune
            && let Some(parent) = state.pages[page.0].parent
        {
            state.pages[parent.0].children.retain(|c| *c != page);
        }
        true
    }

    /// Membership test honouring trailing-slash equivalence.
    pub async fn contains(&self, url: &str) -> bool {
        self.guard.lock().await.visited_key(url).is_some()
    }

    pub async fn total_pages(&self) -> usize {
        self.guard.lock().await.total_pages
    }

    pub async fn len(&self) -> usize {
        self.guard.lock().await.visited.len()
    }


    /// Copy of the adjacency map, keyed by canonical URL.
    pub async fn adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.guard.lock().await.adjacency()
    }

    /// Copy of the page tree rooted at the entry page.
    pub async fn tree(&self) -> Page {
        let state = self.guard.lock().await;
        state.build_page(self.root())
    }

    pub async fn snapshot(&self) -> SiteMap {
        let state = self.guard.lock().await;
        SiteMap {
            entry_url: self.entry_url.to_string(),
            total_pages: state.total_pages,
            visited: state.adjacency(),
            root: state.build_page(self.root()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn url(raw: &str) -> PageUrl {
        PageUrl::parse_request_uri(raw).unwrap()
    }

    fn graph() -> SiteGraph {
        SiteGraph::new(url("https://monzo.com/"))
    }

    #[tokio::test]
    async fn test_new_graph_reserves_entry() {
        let site = graph();
        assert!(site.contains("https://monzo.com/").await);
        assert!(site.contains("https://monzo.com").await);
        assert_eq!(site.len().await, 1);
        assert_eq!(site.total_pages().await, 0);
    }

    #[tokio::test]
    async fn test_try_reserve_once() {
        let site = graph();
        let news = url("https://monzo.com/news");
        assert!(site.try_reserve(site.root(), &news).await.is_some());
        assert!(site.try_reserve(site.root(), &news).await.is_none());
    }

    #[tokio::test]
    async fn test_try_reserve_trailing_slash_equivalence() {
        let site = graph();
        let root = site.root();
        assert!(site.try_reserve(root, &url("https://monzo.com/a")).await.is_some());
        assert!(site.try_reserve(root, &url("https://monzo.com/a/")).await.is_none());

        assert!(site.try_reserve(root, &url("https://monzo.com/b/")).await.is_some());
        assert!(site.try_reserve(root, &url("https://monzo.com/b")).await.is_none());
    }

    #[tokio::test]
    async fn test_try_reserve_concurrent_single_winner() {
        let site = Arc::new(graph());
        let target = url("https://monzo.com/contested");

        let attempts = (0..64).map(|_| {
            let site = site.clone();
            let target = target.clone();
            tokio::spawn(async move { site.try_reserve(site.root(), &target).await })
        });

        let results = futures::future::join_all(attempts).await;
        let winners = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Some(_))))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(site.tree().await.links.len(), 1);
    }

    #[tokio::test]
    async fn test_record_edge_appends_and_counts() {
        let site = graph();
        let root = site.root();
        site.record_edge(root, &url("https://monzo.com/a")).await;
        site.record_edge(root, &url("https://monzo.com/b")).await;

        let adjacency = site.adjacency().await;
        assert_eq!(
            adjacency["https://monzo.com/"],
            vec!["https://monzo.com/a", "https://monzo.com/b"]
        );
        assert_eq!(site.tree().await.link_count, 2);
    }

    #[tokio::test]
    async fn test_mark_crawled_is_idempotent() {
        let site = graph();
        assert!(site.mark_crawled(site.root()).await);
        assert!(!site.mark_crawled(site.root()).await);
        assert_eq!(site.total_pages().await, 1);
    }

    #[tokio::test]
    async fn test_evict_removes_entry_and_prunes_tree() {
        let site = graph();
        let root = site.root();
        let pdf = site
            .try_reserve(root, &url("https://monzo.com/report.pdf"))
            .await
            .unwrap();

        assert!(site.evict(pdf).await);
        assert!(!site.contains("https://monzo.com/report.pdf").await);
        assert!(site.tree().await.links.is_empty());
        assert!(!site.evict(pdf).await);
    }

    #[tokio::test]
    async fn test_evict_retain_keeps_tree_node() {
        let site = graph().with_eviction_policy(EvictionPolicy::Retain);
        let root = site.root();
        let pdf = site
            .try_reserve(root, &url("https://monzo.com/report.pdf"))
            .await
            .unwrap();

        site.evict(pdf).await;

        let tree = site.tree().await;
        assert_eq!(tree.links.len(), 1);
        assert_eq!(tree.links[0].url, "https://monzo.com/report.pdf");
        assert!(!site.contains("https://monzo.com/report.pdf").await);
    }

    #[tokio::test]
    async fn test_evict_uncounts_crawled_page() {
        let site = graph();
        let page = site
            .try_reserve(site.root(), &url("https://monzo.com/a"))
            .await
            .unwrap();
        site.mark_crawled(page).await;
        assert_eq!(site.total_pages().await, 1);

        site.evict(page).await;
        assert_eq!(site.total_pages().await, 0);
    }

    #[tokio::test]
    async fn test_evicted_url_is_never_reserved_again() {
        let site = graph();
        let root = site.root();
        let pdf = url("https://monzo.com/file.pdf");
        let id = site.try_reserve(root, &pdf).await.unwrap();
        site.evict(id).await;

        assert!(!site.contains(pdf.as_str()).await);
        assert!(site.try_reserve(root, &pdf).await.is_none());
        assert!(site.try_reserve(root, &url("https://monzo.com/file.pdf/")).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_tree_nesting() {
        let site = graph();
        let root = site.root();
        let blog = site.try_reserve(root, &url("https://monzo.com/blog")).await.unwrap();
        site.try_reserve(blog, &url("https://monzo.com/blog/haha"))
            .await
            .unwrap();

        let snapshot = site.snapshot().await;
        assert_eq!(snapshot.entry_url, "https://monzo.com/");
        assert_eq!(snapshot.visited.len(), 3);
        assert_eq!(snapshot.root.links[0].url, "https://monzo.com/blog");
        assert_eq!(
            snapshot.root.links[0].links[0].url,
            "https://monzo.com/blog/haha"
        );
        assert_eq!(snapshot.root.urls().len(), 3);
    }
}
