use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

const SECURE_TOKEN_CERTS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

#[derive(Error, Debug)]
pub enum KeyFetchError {
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("no certificate for key id")]
    UnknownKeyId,
}

#[derive(Clone)]
struct CachedKeys {
    keys: HashMap<String, String>,
    expires_at: Instant,
}

/// Cache of the Google public certificates used to verify ID tokens,
/// refreshed per the Cache-Control max-age of the certs endpoint.
#[derive(Clone)]
pub struct PublicKeyCache {
    client: Client,
    certs_url: String,
    cache: Arc<RwLock<Option<CachedKeys>>>,
}

impl PublicKeyCache {
    pub fn new() -> Self {
        Self::with_url(SECURE_TOKEN_CERTS_URL.to_string())
    }

    pub fn with_url(certs_url: String) -> Self {
        Self {
            client: Client::new(),
            certs_url,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn get_key(&self, kid: &str) -> Result<String, KeyFetchError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = &*cache {
                if Instant::now() < cached.expires_at {
                    if let Some(pem) = cached.keys.get(kid) {
                        return Ok(pem.clone());
                    }
                }
            }
        }

        self.refresh().await?;

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|c| c.keys.get(kid).cloned())
            .ok_or(KeyFetchError::UnknownKeyId)
    }

    async fn refresh(&self) -> Result<(), KeyFetchError> {
        let response = self.client.get(&self.certs_url).send().await?;

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| {
                s.split(',').find_map(|part| {
                    part.trim()
                        .strip_prefix("max-age=")
                        .and_then(|v| v.parse::<u64>().ok())
                })
            })
            .unwrap_or(3600);

        let keys: HashMap<String, String> = response.json().await?;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys,
            expires_at: Instant::now() + Duration::from_secs(max_age),
        });
        Ok(())
    }
}

impl Default for PublicKeyCache {
    fn default() -> Self {
        Self::new()
    }
}
