use reqwest::{Client, redirect::Policy};
use std::time::Duration;

use super::error::ExtractorError;

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn builder(timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .use_rustls_tls()
        .user_agent(DEFAULT_UA)
        .timeout(timeout)
}

/// Shared client used by sources and hosters.
pub fn default_client() -> Result<Client, ExtractorError> {
    client_with_timeout(DEFAULT_TIMEOUT)
}

pub fn client_with_timeout(timeout: Duration) -> Result<Client, ExtractorError> {
    Ok(builder(timeout).build()?)
}

/// A client that stops at the first redirect, for sites that hand out the
/// hoster url in the `Location` header.
pub fn no_redirect_client() -> Result<Client, ExtractorError> {
    Ok(builder(DEFAULT_TIMEOUT).redirect(Policy::none()).build()?)
}
