// Output projections of a finished crawl

use crate::config::MapType;
use serde::Serialize;
use sitemapper_scanner::{Page, SiteMap};

/// One row of the adjacency view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashPage {
    pub url: String,
    pub total_links: usize,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteTree {
    pub entry_page: Page,
    pub total_pages: usize,
}

/// The shape handed to a writer, chosen once from the configured map type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SitemapView {
    Adjacency(Vec<HashPage>),
    Tree(SiteTree),
}

impl SitemapView {
    pub fn build(site: &SiteMap, map_type: MapType) -> Self {
        match map_type {
            MapType::Hash => SitemapView::Adjacency(adjacency_pages(site)),
            MapType::Tree => SitemapView::Tree(SiteTree {
                entry_page: site.root.clone(),
                total_pages: site.total_pages,
            }),
        }
    }

    /// Number of pages the view lists.
    pub fn page_count(&self) -> usize {
        match self {
            SitemapView::Adjacency(pages) => pages.len(),
            SitemapView::Tree(tree) => tree.entry_page.urls().len(),
        }
    }
}

/// Adjacency rows ordered by URL length, ties broken lexicographically.
pub fn adjacency_pages(site: &SiteMap) -> Vec<HashPage> {
    let mut pages: Vec<HashPage> = site
        .visited
        .iter()
        .map(|(url, links)| HashPage {
            url: url.clone(),
            total_links: links.len(),
            links: links.clone(),
        })
        .collect();

    pages.sort_by(|a, b| a.url.len().cmp(&b.url.len()).then_with(|| a.url.cmp(&b.url)));
    pages
}
