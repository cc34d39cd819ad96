//! Entitlement records and the effective-entitlement resolver.
//!
//! An entitlement document keeps two independently written sub-records (a
//! store purchase and a manual admin grant) plus a derived `effective`
//! sub-record. The effective fields are never edited directly; they are
//! recomputed from the two inputs on every write of either one.


use serde::{Deserialize, Serialize};

pub const PLATFORM_ANDROID: &str = "android";
pub const PLATFORM_MANUAL: &str = "manual";
pub const SUBSCRIPTION_COMPLIMENTARY: &str = "complimentary";

/// Store-purchase verification result, written only by the subscription
/// verifier. Expired purchases are kept for history, not deleted.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub active: bool,
    /// Expiry instant in epoch milliseconds; absent or non-positive means
    /// expired.
    pub expiry_millis: Option<i64>,
    pub platform: Option<String>,
    pub subscription_type: Option<String>,
    pub product_id: Option<String>,
}

/// Admin-granted premium, written only by `set_tenant_member_access`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualGrant {
    pub active: bool,
    pub granted_by: Option<String>,
    pub granted_at: Option<String>,
}

/// Derived entitlement state; a pure function of the two sub-records.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveEntitlement {
    pub active: bool,
    /// `None` while a manual grant is active ("no expiry while manual").
    pub valid_until_millis: Option<i64>,
    pub platform: Option<String>,
    pub subscription_type: Option<String>,
}

/// The per-(tenant, user) entitlement document.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    #[serde(default)]
    pub purchase: PurchaseRecord,
    #[serde(default)]
    pub manual: ManualGrant,
    #[serde(default)]
    pub effective: EffectiveEntitlement,
    pub updated_at: Option<String>,
}

impl EntitlementRecord {
    /// Recomputes the derived fields against `now_millis`.
    pub fn recompute_effective(&mut self, now_millis: i64) {
        self.effective = resolve_effective(&self.manual, &self.purchase, now_millis);
    }
}

/// Whether a purchase counts as active at `now_millis`. A missing or
/// malformed expiry is treated as already expired rather than an error.
fn purchase_active_at(purchase: &PurchaseRecord, now_millis: i64) -> bool {
    purchase.active
        && purchase
            .expiry_millis
            .map(|expiry| expiry > now_millis)
            .unwrap_or(false)
}

/// Resolves the effective entitlement. The manual grant always wins while
/// active: it overrides purchase expiry entirely and reports the
/// complimentary subscription type.
pub fn resolve_effective(
    manual: &ManualGrant,
    purchase: &PurchaseRecord,
    now_millis: i64,
) -> EffectiveEntitlement {
    if manual.active {
        return EffectiveEntitlement {
            active: true,
            valid_until_millis: None,
            platform: Some(PLATFORM_MANUAL.to_string()),
            subscription_type: Some(SUBSCRIPTION_COMPLIMENTARY.to_string()),
        };
    }

    EffectiveEntitlement {
        active: purchase_active_at(purchase, now_millis),
        valid_until_millis: purchase.expiry_millis,
        platform: purchase.platform.clone(),
        subscription_type: purchase.subscription_type.clone(),
    }
}
