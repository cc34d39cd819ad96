use http::Extensions;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use reqwest::{header, Request, Response};
use std::sync::Arc;
use tokio::sync::OnceCell;
use yup_oauth2::authenticator::Authenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

type ServiceAuth = Authenticator<HttpsConnector<HttpConnector>>;

/// Scopes for the Firebase-facing clients (Firestore, Identity Toolkit, Storage).
pub const FIREBASE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase",
];

/// Scope for the Play Developer API used by subscription verification.
pub const ANDROID_PUBLISHER_SCOPES: &[&str] =
    &["https://www.googleapis.com/auth/androidpublisher"];

/// `reqwest` middleware that attaches a service-account bearer token to every
/// outbound request. The authenticator is built lazily on first use and shared;
/// `yup-oauth2` caches and refreshes the access token itself.
#[derive(Clone)]
pub struct GoogleAuthMiddleware {
    key: ServiceAccountKey,
    scopes: &'static [&'static str],
    authenticator: Arc<OnceCell<ServiceAuth>>,
}

impl GoogleAuthMiddleware {
    pub fn new(key: ServiceAccountKey, scopes: &'static [&'static str]) -> Self {
        Self {
            key,
            scopes,
            authenticator: Arc::new(OnceCell::new()),
        }
    }

    async fn bearer_token(&self) -> Result<String, anyhow::Error> {
        let auth = self
            .authenticator
            .get_or_try_init(|| async {
                ServiceAccountAuthenticator::builder(self.key.clone())
                    .build()
                    .await
                    .map_err(std::io::Error::other)
            })
            .await?;

        let token = auth.token(self.scopes).await?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("authenticator returned an empty access token"))
    }
}

#[async_trait::async_trait]
impl reqwest_middleware::Middleware for GoogleAuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self.bearer_token().await.map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!(
                "failed to obtain service-account token: {}",
                e
            ))
        })?;

        let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("invalid bearer header: {}", e))
        })?;
        req.headers_mut().insert(header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}
