use crate::error::{Result, ScanError};
use crate::page_url::PageUrl;
use reqwest::Client;
use scraper::{Html, Selector};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "Sitemapper/0.1 (https://github.com/trapdoorsec/sitemapper)";

/// A page as it came off the wire.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub content_type: String,
    pub body: String,
}

impl FetchedPage {
    pub fn is_html(&self) -> bool {
        is_html(&self.content_type)
    }
}

/// One GET per call. Implementations must treat non-2xx answers as errors.
pub trait PageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &PageUrl) -> impl Future<Output = Result<FetchedPage>> + Send;
}

/// reqwest-backed fetcher used for real crawls.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50) // Connection pooling
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &PageUrl) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let response = self.client.get(url.as_url().clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        // Skip downloading bodies we are not going to parse
        let body = if is_html(&content_type) {
            response.text().await?
        } else {
            String::new()
        };

        Ok(FetchedPage { content_type, body })
    }
}

/// Prefix match on `text/html`, ignoring case.
pub fn is_html(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("text/html"))
}

/// Raw `href` values of the anchors in an HTML document, in document order.
///
/// Values are yielded verbatim; resolving and scoping them is the link
/// validator's job. The iterator owns its values and is consumed once.
pub struct Hrefs {
    inner: std::vec::IntoIter<String>,
}

impl Iterator for Hrefs {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Hrefs {}

pub fn extract_hrefs(body: &str) -> Hrefs {
    let document = Html::parse_document(body);
    let selector = Selector::parse("a[href]").unwrap();

    let hrefs: Vec<String> = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect();

    Hrefs {
        inner: hrefs.into_iter(),
    }
}
