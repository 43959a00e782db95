//! Destination URL validation and normalization.
//!
//! Every URL a link can redirect to (original, smart, geo, variant) goes
//! through [`normalize_destination`] before it is stored.

use url::Url;

/// Reasons a destination URL is rejected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DestinationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS destinations are allowed")]
    UnsupportedProtocol,

    #[error("Destination URL must have a host")]
    MissingHost,

    #[error("Destination points back at this service")]
    SelfReference,
}

/// Validates and normalizes a destination URL.
///
/// # Normalization
///
/// - Only `http` and `https` are accepted
/// - Host is lower-cased, default ports are dropped
/// - Path, query and fragment are preserved
///
/// # Errors
///
/// Returns [`DestinationError::SelfReference`] when the host equals
/// `own_host`, which would create a redirect loop.
pub fn normalize_destination(
    input: &str,
    own_host: Option<&str>,
) -> Result<String, DestinationError> {
    let mut url =
        Url::parse(input.trim()).map_err(|e| DestinationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(DestinationError::UnsupportedProtocol),
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(DestinationError::MissingHost)?
        .to_ascii_lowercase();

    if own_host.is_some_and(|own| own.eq_ignore_ascii_case(&host)) {
        return Err(DestinationError::SelfReference);
    }

    url.set_host(Some(&host))
        .map_err(|e| DestinationError::InvalidFormat(e.to_string()))?;

    let is_default_port = matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    );
    if is_default_port {
        // Cannot fail for http(s) URLs that have a host.
        let _ = url.set_port(None);
    }

    Ok(url.to_string())
}

/// Extracts the host from a referrer URL for analytics grouping.
///
/// Returns `None` for empty or unparseable referrers.
pub fn referrer_host(referrer: &str) -> Option<String> {
    let referrer = referrer.trim();
    if referrer.is_empty() {
        return None;
    }

    Url::parse(referrer)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_simple() {
        assert_eq!(
            normalize_destination("https://example.com", None).unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_normalize_lowercases_host_only() {
        assert_eq!(
            normalize_destination("https://EXAMPLE.com/Path?Q=1", None).unwrap(),
            "https://example.com/Path?Q=1"
        );
    }

    #[test]
    fn test_normalize_drops_default_port() {
        assert_eq!(
            normalize_destination("http://example.com:80/a", None).unwrap(),
            "http://example.com/a"
        );
        assert_eq!(
            normalize_destination("https://example.com:8443/a", None).unwrap(),
            "https://example.com:8443/a"
        );
    }

    #[test]
    fn test_normalize_keeps_fragment_and_utm() {
        let url = "https://shop.example.com/p?utm_source=bio#reviews";
        assert_eq!(normalize_destination(url, None).unwrap(), url);
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(
            normalize_destination("  https://example.com/x  ", None).unwrap(),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_reject_invalid() {
        assert!(matches!(
            normalize_destination("not a url", None),
            Err(DestinationError::InvalidFormat(_))
        ));
        assert!(matches!(
            normalize_destination("", None),
            Err(DestinationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_reject_dangerous_schemes() {
        for input in [
            "javascript:alert(1)",
            "data:text/html,hi",
            "file:///etc/passwd",
            "ftp://example.com",
            "mailto:a@example.com",
        ] {
            assert_eq!(
                normalize_destination(input, None),
                Err(DestinationError::UnsupportedProtocol),
                "{input}"
            );
        }
    }

    #[test]
    fn test_reject_self_reference() {
        assert_eq!(
            normalize_destination("https://SL.example.com/r/abc", Some("sl.example.com")),
            Err(DestinationError::SelfReference)
        );
        assert!(normalize_destination("https://example.com", Some("sl.example.com")).is_ok());
    }

    #[test]
    fn test_referrer_host() {
        assert_eq!(
            referrer_host("https://www.Instagram.com/p/123").as_deref(),
            Some("instagram.com")
        );
        assert_eq!(referrer_host(""), None);
        assert_eq!(referrer_host("garbage"), None);
    }
}
