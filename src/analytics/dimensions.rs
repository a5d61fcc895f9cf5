//! Reduction of raw request attributes to counter discriminators.

use once_cell::sync::Lazy;
use regex::Regex;

static PATH_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9/_-]").unwrap());

/// Referrer sources with a dedicated bucket, matched as hostname substrings in
/// order. Everything else parseable is `other`.
const REFERRER_SOURCES: &[(&str, &str)] = &[
    ("google", "google"),
    ("twitter", "twitter"),
    ("x.com", "twitter"),
    ("facebook", "facebook"),
    ("linkedin", "linkedin"),
    ("github", "github"),
    ("reddit", "reddit"),
    ("youtube", "youtube"),
    ("abada.kr", "abada"),
];

pub const DIRECT: &str = "direct";
pub const OTHER: &str = "other";

/// Strip characters outside `[A-Za-z0-9/_-]` and lower-case. An empty
/// result is the site root.
pub fn clean_page_path(page: &str) -> String {
    let cleaned = PATH_JUNK.replace_all(page, "").to_lowercase();
    if cleaned.is_empty() {
        "/".to_string()
    } else {
        cleaned
    }
}

/// Classify a referrer URL. Absent or unparseable referrers are `direct`.
pub fn referrer_source(referrer: Option<&str>) -> &'static str {
    let Some(raw) = referrer.map(str::trim).filter(|r| !r.is_empty()) else {
        return DIRECT;
    };
    let host = match url::Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => return DIRECT,
        },
        Err(_) => return DIRECT,
    };
    REFERRER_SOURCES
        .iter()
        .find(|(needle, _)| host.contains(*needle))
        .map_or(OTHER, |&(_, source)| source)
}

/// Normalise a transport country hint (`CF-IPCountry`). Unknown (`XX`),
/// Tor (`T1`) and anything that is not two ASCII letters yield `None`.
pub fn country_code(hint: Option<&str>) -> Option<String> {
    let code = hint?.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    if code == "XX" || code == "T1" {
        return None;
    }
    Some(code)
}
