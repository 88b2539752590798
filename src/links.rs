//! Link normalization and domain classification
//!
//! Raw link text scraped from a page goes through [`normalize_link`] to become an
//! absolute URL (or nothing), and [`classify`] then sorts it into one of the link
//! families the table cares about.

use url::Url;

/// Hosts whose pages aggregate social posts about an event
///
/// `togetter.com` is handled separately because its path and subdomain matter.
pub const TWEET_SUMMARY_DOMAINS: &[&str] = &["posfie.com"];

const TOGETTER_HOST: &str = "togetter.com";
const TOGETTER_ALWAYS: &[&str] = &["min.togetter.com", "matome.togetter.com"];
const TOGETTER_PATHS: &[&str] = &["/li/", "/id/"];

/// Hosts that serve presentation decks
pub const SLIDE_DOMAINS: &[&str] = &[
    "speakerdeck.com",
    "slideshare.net",
    "docswell.com",
    "docs.google.com",
    "canva.com",
    "pitch.com",
    "prezi.com",
    "slides.com",
    "gamma.app",
];

/// Documents host that only counts as a slide link for presentations
const DOCUMENTS_HOST: &str = "docs.google.com";
const PRESENTATION_PATH: &str = "/presentation/";

/// Link shorteners resolved before classification
pub const SHORTENER_DOMAINS: &[&str] = &[
    "bit.ly",
    "t.co",
    "goo.gl",
    "tinyurl.com",
    "ow.ly",
    "buff.ly",
    "is.gd",
    "lnkd.in",
    "amzn.to",
];

/// Family a normalized link belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    TweetSummary,
    SlideCandidate,
    Shortener,
    Other,
}

/// Every host that may appear without a scheme in page text
pub fn known_domains() -> impl Iterator<Item = &'static str> {
    std::iter::once(TOGETTER_HOST)
        .chain(TWEET_SUMMARY_DOMAINS.iter().copied())
        .chain(SLIDE_DOMAINS.iter().copied())
        .chain(SHORTENER_DOMAINS.iter().copied())
}

/// Exact or subdomain match of `host` against `domain`
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn matches_any(host: &str, domains: &[&str]) -> bool {
    domains.iter().any(|d| host_matches(host, d))
}

const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&#x27;", "'"),
    ("&#x2F;", "/"),
    ("&#x2f;", "/"),
    ("&nbsp;", " "),
    // Last so "&amp;lt;" decodes to "&lt;" rather than "<"
    ("&amp;", "&"),
];

/// Decode the fixed set of HTML entities that show up in hrefs and page text
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, plain)| acc.replace(entity, plain))
}

const WRAPPERS: &[(char, char)] = &[('<', '>'), ('"', '"'), ('\'', '\''), ('「', '」')];
const TRAILING: &[char] = &[
    ')', ']', '}', '>', ',', '.', ';', ':', '!', '?', '\'', '"', '）', '」', '、', '。',
];

/// Turn raw link text into an absolute `http(s)` URL
///
/// Returns `None` for anything that does not look like a link. Bare hosts are only
/// accepted when they belong to one of the known domain sets.
pub fn normalize_link(raw: &str) -> Option<String> {
    let mut link = raw.trim();

    for (open, close) in WRAPPERS {
        if let Some(inner) = link
            .strip_prefix(*open)
            .and_then(|rest| rest.strip_suffix(*close))
        {
            link = inner.trim();
        }
    }
    let link = link.trim_start_matches(['<', '"', '\'', '「']);

    let decoded = decode_entities(link);
    let trimmed = decoded.trim().trim_end_matches(TRAILING);
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    let absolute = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        let host = lower.split(['/', '?', '#']).next().unwrap_or_default();
        let host = host.strip_prefix("www.").unwrap_or(host);
        if !known_domains().any(|d| host_matches(host, d)) {
            return None;
        }
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&absolute).ok()?;
    parsed.host_str()?;
    Some(absolute)
}

/// Classify a normalized link by its host and, for some hosts, its path
pub fn classify(link: &str) -> LinkKind {
    let Ok(parsed) = Url::parse(link) else {
        return LinkKind::Other;
    };
    let Some(host) = parsed.host_str() else {
        return LinkKind::Other;
    };
    let host = host.to_ascii_lowercase();
    let path = parsed.path();

    if host_matches(&host, TOGETTER_HOST) {
        if TOGETTER_ALWAYS.contains(&host.as_str()) {
            return LinkKind::TweetSummary;
        }
        let primary = host == TOGETTER_HOST || host == format!("www.{TOGETTER_HOST}");
        if primary && TOGETTER_PATHS.iter().any(|p| path.starts_with(p)) {
            return LinkKind::TweetSummary;
        }
        return LinkKind::Other;
    }
    if matches_any(&host, TWEET_SUMMARY_DOMAINS) {
        return LinkKind::TweetSummary;
    }

    if host_matches(&host, DOCUMENTS_HOST) {
        return if path.contains(PRESENTATION_PATH) {
            LinkKind::SlideCandidate
        } else {
            LinkKind::Other
        };
    }
    if matches_any(&host, SLIDE_DOMAINS) {
        return LinkKind::SlideCandidate;
    }

    if matches_any(&host, SHORTENER_DOMAINS) {
        return LinkKind::Shortener;
    }

    LinkKind::Other
}

/// Reduce an event detail URL to `scheme://host/event/<id>/`
///
/// Query strings, fragments and anything after the event id are dropped. URLs that
/// do not contain an `/event/<id>` segment are returned with only the query and
/// fragment removed.
pub fn canonical_event_url(raw: &str) -> Option<String> {
    let mut parsed = Url::parse(raw.trim()).ok()?;
    parsed.set_query(None);
    parsed.set_fragment(None);

    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    if let Some(pos) = segments.iter().position(|s| s == "event")
        && let Some(id) = segments.get(pos + 1)
    {
        parsed.set_path(&format!("/event/{id}/"));
    }

    Some(parsed.to_string())
}

/// Utility for normalizing URLs for deduplication
pub struct UrlNormalizer;

impl UrlNormalizer {
    /// Normalize a URL for deduplication
    ///
    /// This removes trailing slashes and fragments so that equivalent links found by
    /// different scanning passes are treated as identical.
    pub fn normalize(url: &str) -> String {
        let mut normalized = url.trim().to_string();

        if let Some(pos) = normalized.find('#') {
            normalized.truncate(pos);
        }

        // Root paths keep their slash ("https://example.com/")
        if let Some(query_pos) = normalized.find('?') {
            if normalized[..query_pos].ends_with('/') {
                let path_slashes = normalized[..query_pos].matches('/').count();
                if path_slashes > 3 {
                    normalized.remove(query_pos - 1);
                }
            }
        } else if normalized.ends_with('/') {
            let path_slashes = normalized.matches('/').count();
            if path_slashes > 3 {
                normalized.pop();
            }
        }

        normalized
    }
}
