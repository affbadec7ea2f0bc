pub mod crawler;
pub mod error;
pub mod fetch;
pub mod page_url;
pub mod result;
pub mod site;
pub mod validator;

pub use crawler::{Crawler, DEFAULT_CONCURRENCY, ProgressCallback};
pub use error::{LinkRejection, ScanError};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use page_url::PageUrl;
pub use result::{CrawlReport, PageFailure};
pub use site::{EvictionPolicy, Page, PageId, SiteGraph, SiteMap};
pub use validator::LinkValidator;
