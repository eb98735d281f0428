use tracing::debug;
use url::Url;

use crate::config::SummarySettings;

const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// Reduces extracted candidates to remote, non-blacklisted URLs.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    site_host: Option<String>,
    blacklist: Vec<String>,
}

impl UrlFilter {
    pub fn new(site_url: &Url, settings: &SummarySettings) -> Self {
        Self {
            site_host: site_url.host_str().map(normalize_host),
            blacklist: settings
                .blacklisted_hosts()
                .iter()
                .map(|host| normalize_host(host))
                .collect(),
        }
    }

    /// Eligible URLs in input order. Duplicates are kept.
    pub fn eligible(&self, candidates: &[String]) -> Vec<Url> {
        candidates
            .iter()
            .filter_map(|raw| {
                let Some(url) = sanitize(raw) else {
                    debug!(url = %raw, "dropping malformed url");
                    return None;
                };
                if !self.is_remote(&url) {
                    debug!(url = %url, "dropping local url");
                    return None;
                }
                if self.is_blacklisted(&url) {
                    debug!(url = %url, "dropping blacklisted url");
                    return None;
                }
                Some(url)
            })
            .collect()
    }

    /// A URL is remote when its host differs from the site's host, ignoring
    /// case and a leading `www.`. URLs without a host are never remote.
    pub fn is_remote(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.site_host.as_deref() != Some(normalize_host(host).as_str()),
            None => false,
        }
    }

    pub fn is_blacklisted(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = normalize_host(host);
        self.blacklist.iter().any(|entry| *entry == host)
    }
}

/// Trim, give bare `www.` hosts a scheme, and parse. Only http, https and
/// ftp URLs with a host survive.
pub fn sanitize(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = if trimmed
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
    {
        Url::parse(&format!("http://{trimmed}"))
    } else {
        Url::parse(trimmed)
    };

    let url = parsed.ok()?;
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}
