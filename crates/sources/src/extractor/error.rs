use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("crypto error: {0}")]
    CryptoError(String),
    #[error("selector error: {0}")]
    SelectorError(String),
    #[error("hls playlist error: {0}")]
    HlsPlaylistError(String),
    #[error("js error: {0}")]
    JsError(String),
    #[error("unsupported hoster: {0}")]
    UnsupportedHoster(String),
    #[error("no streams found")]
    NoStreamsFound,
    #[error("not supported: {0}")]
    NotSupported(&'static str),
    #[error("select at least one filter")]
    MissingFilter,
    #[error("unknown source: {0}")]
    UnknownSource(String),
    #[error("other: {0}")]
    Other(String),
}

impl ExtractorError {
    /// Shorthand for markup that no longer matches what a parser expects.
    pub fn missing(what: impl Into<String>) -> Self {
        ExtractorError::Other(format!("missing {}", what.into()))
    }
}
