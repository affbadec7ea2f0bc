use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed reference '{reference}': {source}")]
    MalformedReference {
        reference: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported content type '{content_type}' for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Crawl cancelled")]
    Cancelled,
}

impl ScanError {
    /// True for failures that happened on the wire (connect, timeout, non-2xx).
    pub fn is_network(&self) -> bool {
        matches!(self, ScanError::HttpError(_) | ScanError::UnexpectedStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why the link validator turned a discovered href down.
///
/// None of these are crawl failures; rejected links are simply skipped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRejection {
    #[error("link is an obfuscated e-mail address")]
    EmailObfuscated,

    #[error("link is neither root-relative nor on the site host")]
    NotSameHostPrefix,

    #[error("link cannot be resolved against its parent page")]
    MalformedReference,

    #[error("link carries a query string")]
    HasQueryString,

    #[error("link points to another host")]
    ExternalHost,

    #[error("link uses a different scheme than the site")]
    SchemeMismatch,

    #[error("link is already a child of this page")]
    AlreadyChildOfParent,
}
