//! Tenant configuration documents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TENANTS_COLLECTION: &str = "tenants";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantVisibility {
    #[default]
    Public,
    Private,
}

/// The `tenants/{tenantId}` document: visibility, the product-id to
/// subscription-type mapping for store verification, and the blob-store
/// prefixes media deletes are allowed to touch.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    pub display_name: Option<String>,
    #[serde(default)]
    pub visibility: TenantVisibility,
    /// productId -> "monthly" | "yearly"
    #[serde(default)]
    pub play_products: HashMap<String, String>,
    #[serde(default)]
    pub storage_prefixes: Vec<String>,
}

pub fn tenant_path(tenant_id: &str) -> String {
    format!("{}/{}", TENANTS_COLLECTION, tenant_id)
}
