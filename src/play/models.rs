use serde::Deserialize;

/// `purchases.subscriptions.get` response, trimmed to what verification
/// needs. `expiryTimeMillis` arrives as a decimal string.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPurchase {
    pub expiry_time_millis: Option<String>,
    pub start_time_millis: Option<String>,
    pub auto_renewing: Option<bool>,
    pub payment_state: Option<i32>,
    pub order_id: Option<String>,
}

impl SubscriptionPurchase {
    /// Expiry in epoch milliseconds; malformed or absent values coerce to
    /// `None`, which downstream treats as expired.
    pub fn expiry_millis(&self) -> Option<i64> {
        self.expiry_time_millis
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
    }
}
