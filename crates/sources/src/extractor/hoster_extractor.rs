use std::str::FromStr;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::error::ExtractorError;
use super::factory::Hoster;
use crate::extractor::default::DEFAULT_UA;
use crate::media::Video;

/// Shared HTTP state of a host decoder or a site module.
///
/// Holds the client and the headers every request carries.
#[derive(Debug, Clone)]
pub struct Extractor {
    // name used in logs and quality labels, e.g. "StreamTape", "AnimeFlv"
    pub name: String,
    pub client: Client,
    headers: HeaderMap,
}

impl Extractor {
    pub fn new<S: Into<String>>(name: S, client: Client) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_UA),
        );
        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );

        Self {
            name: name.into(),
            client,
            headers: default_headers,
        }
    }

    #[inline]
    pub fn set_referer(&mut self, referer: &str) {
        self.add_header_typed(reqwest::header::REFERER, referer);
    }

    #[inline]
    pub fn set_origin(&mut self, origin: &str) {
        self.add_header_typed(reqwest::header::ORIGIN, origin);
    }

    /// Insert an arbitrary header, skipping invalid names or values.
    pub fn add_header<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match HeaderName::from_str(key.as_ref()) {
            Ok(name) => self.add_header_typed(name, value),
            Err(e) => {
                debug!(error = %e, "Invalid header name; skipping");
            }
        }
    }

    pub fn add_header_typed<K: Into<HeaderName>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.headers.insert(key.into(), value);
            }
            Err(e) => {
                debug!(error = %e, "Invalid header value; skipping");
            }
        }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Build a request carrying the default headers.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).headers(self.headers.clone())
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, ExtractorError> {
        debug!(extractor = %self.name, url = %url, "GET");
        Ok(self.get(url).send().await?.error_for_status()?.text().await?)
    }

    /// The same headers over another client.
    pub fn with_client(&self, client: Client) -> Self {
        Self {
            client,
            ..self.clone()
        }
    }

    /// The `Location` header of `url`. Only meaningful over a client built
    /// with [`no_redirect_client`](super::default::no_redirect_client).
    pub async fn location(&self, url: &str) -> Result<Option<String>, ExtractorError> {
        debug!(extractor = %self.name, url = %url, "GET (no redirect)");
        let response = self.get(url).send().await?;
        Ok(response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned))
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Headers the player must replay, excluding the ones reqwest sets for us.
    pub fn player_headers(&self) -> FxHashMap<String, String> {
        let mut headers_map =
            FxHashMap::with_capacity_and_hasher(self.headers.len(), Default::default());
        for (key, value) in &self.headers {
            if key == reqwest::header::ACCEPT || key == reqwest::header::ACCEPT_LANGUAGE {
                continue;
            }
            if let Ok(value) = value.to_str() {
                headers_map.insert(key.as_str().to_owned(), value.to_owned());
            }
        }
        headers_map
    }
}

/// A decoder for one video host.
///
/// `prefix` is prepended to the quality labels so that the same host reached
/// through different mirrors stays distinguishable (e.g. `"Okru:"`).
#[async_trait]
pub trait HosterExtractor: Send + Sync {
    fn hoster(&self) -> Hoster;

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_carry_default_headers() {
        let mut extractor = Extractor::new("Test", Client::new());
        extractor.set_referer("https://kaas.am/");
        let request = extractor.get("https://kaas.am/api/show/popular").build().unwrap();
        let headers = request.headers();
        assert_eq!(headers.get(reqwest::header::USER_AGENT).unwrap(), DEFAULT_UA);
        assert_eq!(headers.get(reqwest::header::REFERER).unwrap(), "https://kaas.am/");
        assert!(headers.get(reqwest::header::COOKIE).is_none());
    }

    #[test]
    fn test_player_headers_skip_accept() {
        let mut extractor = Extractor::new("Test", Client::new());
        extractor.set_referer("https://fastream.to/");
        let headers = extractor.player_headers();
        assert_eq!(
            headers.get("referer").map(String::as_str),
            Some("https://fastream.to/")
        );
        assert!(headers.contains_key("user-agent"));
        assert!(!headers.contains_key("accept"));
    }
}
