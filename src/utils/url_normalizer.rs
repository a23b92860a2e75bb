//! Destination URL normalization.
//!
//! Destinations are normalized once, when a link is provisioned, so the
//! redirect path can hand them out verbatim.

use url::Url;

/// Errors that can occur during URL normalization.
#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS destinations are allowed")]
    UnsupportedProtocol,

    #[error("Destination URL has no host")]
    MissingHost,

    #[error("Failed to normalize URL: {0}")]
    NormalizationFailed(String),
}

/// Normalizes a destination URL to a canonical form.
///
/// # Normalization Rules
///
/// 1. **Protocol**: Only HTTP and HTTPS are allowed
/// 2. **Hostname**: Required, converted to lowercase
/// 3. **Default ports**: Removed (80 for HTTP, 443 for HTTPS)
/// 4. **Query and fragment**: Preserved, campaign landing pages rely on both
/// 5. **Path**: Preserved with case sensitivity
///
/// Store deep links (`https://apps.apple.com/...`) are ordinary HTTPS URLs and
/// pass through unchanged apart from host casing.
///
/// # Errors
///
/// Returns [`UrlNormalizationError::InvalidFormat`] for malformed URLs.
/// Returns [`UrlNormalizationError::UnsupportedProtocol`] for non-HTTP(S) schemes,
/// which also rejects `javascript:` and `data:` destinations.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     normalize_url("HTTPS://Play.Google.com:443/store/apps?id=x").unwrap(),
///     "https://play.google.com/store/apps?id=x"
/// );
/// ```
pub fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
    let mut url = Url::parse(input.trim())
        .map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlNormalizationError::UnsupportedProtocol),
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlNormalizationError::MissingHost)?
        .to_ascii_lowercase();

    url.set_host(Some(&host)).map_err(|_| {
        UrlNormalizationError::NormalizationFailed("Failed to set normalized host".to_string())
    })?;

    let is_default_port = matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    );
    if is_default_port {
        url.set_port(None).map_err(|_| {
            UrlNormalizationError::NormalizationFailed("Failed to remove default port".to_string())
        })?;
    }

    Ok(url.to_string())
}

/// Normalizes an optional destination; blank input means "not set".
pub fn normalize_optional_url(
    input: Option<&str>,
) -> Result<Option<String>, UrlNormalizationError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => normalize_url(raw).map(Some),
        None => Ok(None),
    }
}
