use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Reasons a news URL is refused before any request is made.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Only http and https are fetched.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Loopback or private address while local targets are disabled.
    #[error("Local or private address not allowed: {0}")]
    LocalTarget(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validate the configured news URL.
///
/// Rejects non-HTTP(S) schemes always. Loopback, private and link-local
/// hosts are rejected unless `allow_local` is set, which is what test
/// servers bound to 127.0.0.1 need.
///
/// ```
/// use newscloud::util::validate_url;
///
/// assert!(validate_url("https://news.baidu.com/", false).is_ok());
/// assert!(validate_url("http://127.0.0.1:8080/", false).is_err());
/// assert!(validate_url("http://127.0.0.1:8080/", true).is_ok());
/// assert!(validate_url("file:///etc/passwd", true).is_err());
/// ```
pub fn validate_url(url_str: &str, allow_local: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if allow_local {
        return Ok(url);
    }

    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::LocalTarget(host.to_owned()));
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_local_ip(&ip) {
            return Err(UrlValidationError::LocalTarget(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_local_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}
