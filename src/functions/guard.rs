//! Abuse-verification gate for the public-facing operations.
//!
//! The gate checks a client-supplied verification token against an external
//! assessment endpoint. What happens when that endpoint itself fails is an
//! explicit, configured policy rather than an accident of error handling:
//! `Enforce` fails the request, `FailOpen` admits it and logs that the open
//! branch was taken. A token that is present but judged invalid is always
//! denied under either policy.

use super::CallableError;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPolicy {
    /// Verification-backend failures fail the request (`internal`).
    Enforce,
    /// Verification-backend failures admit the request.
    FailOpen,
}

#[derive(Serialize)]
struct AssessmentRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct AssessmentResponse {
    success: bool,
}

pub struct AbuseGuard {
    client: ClientWithMiddleware,
    verify_url: String,
    policy: GuardPolicy,
}

impl AbuseGuard {
    pub fn new(client: ClientWithMiddleware, verify_url: String, policy: GuardPolicy) -> Self {
        Self {
            client,
            verify_url,
            policy,
        }
    }

    pub async fn check(&self, token: Option<&str>) -> Result<(), CallableError> {
        let token = token.ok_or_else(|| {
            CallableError::PermissionDenied("missing verification token".to_string())
        })?;

        let outcome = self.assess(token).await;
        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => Err(CallableError::PermissionDenied(
                "verification token rejected".to_string(),
            )),
            Err(e) => match self.policy {
                GuardPolicy::Enforce => Err(CallableError::Internal(format!(
                    "abuse verification unavailable: {}",
                    e
                ))),
                GuardPolicy::FailOpen => {
                    tracing::warn!(error = %e, "abuse verification unavailable, failing open");
                    Ok(())
                }
            },
        }
    }

    async fn assess(&self, token: &str) -> Result<bool, anyhow::Error> {
        let response = self
            .client
            .post(&self.verify_url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&AssessmentRequest { token })?)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("assessment endpoint returned {}", response.status());
        }
        let body: AssessmentResponse = response.json().await?;
        Ok(body.success)
    }
}
