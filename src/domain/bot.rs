//! Heuristic detection of automated traffic.
//!
//! This only keeps analytics clean; it is not an access control. Misses are
//! acceptable, and new tokens go into [`BOT_TOKENS`] without touching callers.

/// Lowercase substrings identifying crawlers, link unfurlers and HTTP tools.
pub const BOT_TOKENS: &[&str] = &[
    // generic
    "bot",
    "crawl",
    "spider",
    "slurp",
    "preview",
    "fetcher",
    "monitor",
    // social and chat unfurlers
    "facebookexternalhit",
    "facebookcatalog",
    "whatsapp",
    "telegram",
    "skypeuripreview",
    "vkshare",
    "embedly",
    "quora link preview",
    // headless browsers and HTTP clients
    "headlesschrome",
    "phantomjs",
    "lighthouse",
    "curl/",
    "wget/",
    "python-requests",
    "python-urllib",
    "go-http-client",
    "okhttp",
    "axios/",
    "node-fetch",
    "java/",
    "libwww-perl",
];

/// Returns `true` when the user agent looks automated.
///
/// An empty user agent counts as automated: every real browser sends one.
pub fn is_bot(user_agent: &str) -> bool {
    let ua = user_agent.trim().to_ascii_lowercase();
    if ua.is_empty() {
        return true;
    }

    BOT_TOKENS.iter().any(|token| ua.contains(token))
}
