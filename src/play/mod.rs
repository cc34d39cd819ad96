//! Store-purchase verification against the Play Android Publisher API.
//!
//! Verification is read-only: nothing in the database changes unless the
//! receipt check succeeds, so a failed call can always be retried end to end.

pub mod models;

#[cfg(test)]
mod tests;

use crate::core::middleware::ANDROID_PUBLISHER_SCOPES;
use crate::tenants::TenantConfig;
use models::SubscriptionPurchase;
use reqwest_middleware::ClientWithMiddleware;
use std::collections::HashMap;
use thiserror::Error;
use yup_oauth2::ServiceAccountKey;

const ANDROID_PUBLISHER_V3_API: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3";

pub const SUBSCRIPTION_MONTHLY: &str = "monthly";
pub const SUBSCRIPTION_YEARLY: &str = "yearly";

#[derive(Error, Debug)]
pub enum PlayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("Android Publisher API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Pre-tenant-config SKU mapping, honored only for the legacy default tenant.
pub fn legacy_sku_map() -> HashMap<String, String> {
    HashMap::from([
        (
            "premium_monthly".to_string(),
            SUBSCRIPTION_MONTHLY.to_string(),
        ),
        (
            "premium_yearly".to_string(),
            SUBSCRIPTION_YEARLY.to_string(),
        ),
    ])
}

/// Resolves the SKU mapping a verification request must be checked against.
///
/// A tenant without its own `playProducts` map only falls back to the legacy
/// hardcoded mapping when it is the configured default tenant; every other
/// tenant without a mapping cannot verify purchases at all.
pub fn resolve_sku_map(
    tenant: &TenantConfig,
    is_default_tenant: bool,
) -> Option<HashMap<String, String>> {
    if !tenant.play_products.is_empty() {
        return Some(tenant.play_products.clone());
    }
    if is_default_tenant {
        return Some(legacy_sku_map());
    }
    None
}

/// Result of a successful receipt verification.
#[derive(Debug, Clone)]
pub struct VerifiedSubscription {
    pub active: bool,
    pub expiry_millis: Option<i64>,
    pub subscription_type: String,
    pub product_id: String,
}

/// Client for `purchases.subscriptions.get`, authenticated with the
/// androidpublisher scope.
#[derive(Clone)]
pub struct SubscriptionVerifier {
    client: ClientWithMiddleware,
    base_url: String,
    package_name: String,
}

impl SubscriptionVerifier {
    pub fn new(key: ServiceAccountKey, package_name: String) -> Self {
        let client = crate::core::authenticated_client(key, ANDROID_PUBLISHER_SCOPES);
        Self {
            client,
            base_url: ANDROID_PUBLISHER_V3_API.to_string(),
            package_name,
        }
    }

    pub fn new_with_client(
        client: ClientWithMiddleware,
        base_url: String,
        package_name: String,
    ) -> Self {
        Self {
            client,
            base_url,
            package_name,
        }
    }

    /// Validates one purchase token against the store and computes whether
    /// the subscription is active at `now_millis`.
    pub async fn verify(
        &self,
        product_id: &str,
        purchase_token: &str,
        subscription_type: &str,
        now_millis: i64,
    ) -> Result<VerifiedSubscription, PlayError> {
        let url = format!(
            "{}/applications/{}/purchases/subscriptions/{}/tokens/{}",
            self.base_url, self.package_name, product_id, purchase_token
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message =
                crate::core::parse_error_response(response, "subscription lookup failed").await;
            return Err(PlayError::ApiError { status, message });
        }

        let purchase: SubscriptionPurchase = response.json().await?;
        let expiry_millis = purchase.expiry_millis();
        Ok(VerifiedSubscription {
            active: expiry_millis.map(|e| e > now_millis).unwrap_or(false),
            expiry_millis,
            subscription_type: subscription_type.to_string(),
            product_id: product_id.to_string(),
        })
    }
}
