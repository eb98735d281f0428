use bytes::Bytes;
use reqwest::StatusCode;
use url::Url;

/// Result of a header-only probe.
#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub url_final: Url,
    pub status: StatusCode,
    /// Raw `Content-Type` header value, parameters included.
    pub content_type: Option<String>,
}

/// Result of a full-body fetch with a success status.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body_raw: Bytes,
}

/// Body decoded to UTF-8.
#[derive(Debug, Clone)]
pub struct DecodedBody {
    pub text: String,
    /// Name of the encoding the body was decoded from, e.g. `windows-1252`.
    pub encoding: &'static str,
    /// Malformed sequences were replaced with U+FFFD.
    pub lossy: bool,
}
