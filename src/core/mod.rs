pub mod middleware;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use yup_oauth2::ServiceAccountKey;

use middleware::GoogleAuthMiddleware;

/// Standard Google API error body (`{"error": {"code", "message", "status"}}`).
#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorDetails {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
}

impl GoogleErrorResponse {
    pub fn display_message(&self) -> String {
        match &self.error.status {
            Some(status) => format!("{} ({}, code {})", self.error.message, status, self.error.code),
            None => format!("{} (code {})", self.error.message, self.error.code),
        }
    }
}

/// Extracts a readable message from a non-2xx Google API response.
///
/// Falls back to the HTTP status when the body is not the standard error shape.
pub async fn parse_error_response(response: reqwest::Response, default_msg: &str) -> String {
    let status = response.status();
    match response.json::<GoogleErrorResponse>().await {
        Ok(body) => body.display_message(),
        Err(_) => format!("{}: {}", default_msg, status),
    }
}

/// Builds an authenticated client with the retry policy shared by all
/// Google-facing clients in this crate.
pub fn authenticated_client(
    key: ServiceAccountKey,
    scopes: &'static [&'static str],
) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(GoogleAuthMiddleware::new(key, scopes))
        .build()
}

/// Plain client without auth middleware, used by tests to talk to a mock server.
pub fn plain_client() -> ClientWithMiddleware {
    ClientBuilder::new(Client::new()).build()
}
