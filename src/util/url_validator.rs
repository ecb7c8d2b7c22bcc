use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlCheckError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// Parse an absolute http(s) URL with a host.
///
/// Used for the data service base address and for cover image links.
/// Local addresses are accepted: the default service runs on localhost.
pub fn parse_http_url(raw: &str) -> Result<Url, UrlCheckError> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlCheckError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlCheckError::MissingHost);
    }

    Ok(url)
}
