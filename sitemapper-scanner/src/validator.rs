use crate::error::LinkRejection;
use crate::page_url::{PageUrl, same_page, strip_anchor};

/// Marker left in hrefs by e-mail obfuscation scripts.
const EMAIL_PROTECTION_MARKER: &str = "email-protection";

/// Decides which hrefs found on a page stay inside the crawl scope.
#[derive(Debug, Clone)]
pub struct LinkValidator {
    site: PageUrl,
    site_host: String,
}

impl LinkValidator {
    pub fn new(site: PageUrl) -> Self {
        let site_host = site.host().unwrap_or_default().to_string();
        Self { site, site_host }
    }

    /// Validate one raw href found on `parent`.
    ///
    /// `accepted` holds the links already accepted on that parent. Checks run
    /// in a fixed order and the first failing one is reported.
    pub fn validate(
        &self,
        raw: &str,
        parent: &PageUrl,
        accepted: &[PageUrl],
    ) -> Result<PageUrl, LinkRejection> {
        let link = strip_anchor(raw);

        if link.contains(EMAIL_PROTECTION_MARKER) {
            return Err(LinkRejection::EmailObfuscated);
        }

        if !link.starts_with('/') && !link.to_ascii_lowercase().contains(self.site_host.as_str()) {
            return Err(LinkRejection::NotSameHostPrefix);
        }

        let resolved = parent
            .resolve(link)
            .map_err(|_| LinkRejection::MalformedReference)?;

        if resolved.has_query() {
            return Err(LinkRejection::HasQueryString);
        }

        if !resolved.same_host(&self.site) {
            return Err(LinkRejection::ExternalHost);
        }

        if resolved.scheme() != self.site.scheme() {
            return Err(LinkRejection::SchemeMismatch);
        }

        if accepted
            .iter()
            .any(|child| same_page(child.as_str(), resolved.as_str()))
        {
            return Err(LinkRejection::AlreadyChildOfParent);
        }

        Ok(resolved)
    }
}
