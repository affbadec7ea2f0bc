use crate::error::{Result, ScanError};
use serde::{Serialize, Serializer};
use std::fmt;
use url::Url;

/// An absolute page address.
///
/// The canonical string (`as_str`) is the identity of a page in the site
/// graph. Fragments never take part in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageUrl {
    inner: Url,
}

impl PageUrl {
    /// Parse an entry URL. Only absolute `http`/`https` URLs with a host are
    /// accepted; relative paths such as `blog/test` are rejected.
    pub fn parse_request_uri(raw: &str) -> Result<Self> {
        let mut inner = Url::parse(raw.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;

        if !matches!(inner.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                raw,
                inner.scheme()
            )));
        }
        if inner.host_str().is_none_or(str::is_empty) {
            return Err(ScanError::InvalidUrl(format!("{}: missing host", raw)));
        }

        inner.set_fragment(None);
        Ok(Self { inner })
    }

    /// Resolve a (possibly relative) reference against this URL per RFC 3986.
    pub fn resolve(&self, reference: &str) -> Result<Self> {
        let mut inner = self
            .inner
            .join(reference)
            .map_err(|source| ScanError::MalformedReference {
                reference: reference.to_string(),
                source,
            })?;
        inner.set_fragment(None);
        Ok(Self { inner })
    }

    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.inner.host_str()
    }

    pub fn port(&self) -> Option<u16> {
        self.inner.port_or_known_default()
    }

    pub fn has_query(&self) -> bool {
        self.inner.query().is_some_and(|q| !q.is_empty())
    }

    /// Host and port match (the port being the scheme default when omitted).
    pub fn same_host(&self, other: &PageUrl) -> bool {
        self.host() == other.host() && self.port() == other.port()
    }

    /// Canonical form used as the graph key.
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.inner
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.as_str())
    }
}

impl Serialize for PageUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Cut a raw href at its first `/#` anchor marker.
pub fn strip_anchor(raw: &str) -> &str {
    match raw.find("/#") {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

/// The spellings of `key` that name the same page: exact, with a trailing
/// slash, and without one.
pub fn trailing_slash_variants(key: &str) -> [String; 3] {
    [
        key.to_string(),
        format!("{}/", key),
        key.strip_suffix('/').unwrap_or(key).to_string(),
    ]
}

/// True when `a` and `b` differ at most by one trailing slash.
pub fn same_page(a: &str, b: &str) -> bool {
    trailing_slash_variants(a).iter().any(|v| v == b)
}
