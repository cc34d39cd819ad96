use serde::{Deserialize, Serialize};

/// Identity-provider user record (accounts:lookup shape, trimmed to the
/// fields this service reads).
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub local_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    pub provider_user_info: Option<Vec<ProviderUserInfo>>,
    /// Custom claims, stored by the provider as a JSON string.
    pub custom_attributes: Option<String>,
}

impl UserRecord {
    /// Parses custom claims into a JSON map; malformed or absent attributes
    /// yield an empty map rather than an error.
    pub fn claims(&self) -> serde_json::Map<String, serde_json::Value> {
        self.custom_attributes
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|v| match v {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Provider id of the first linked provider, e.g. `"google.com"`.
    pub fn primary_provider(&self) -> Option<String> {
        self.provider_user_info
            .as_ref()
            .and_then(|providers| providers.first())
            .map(|p| p.provider_id.clone())
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUserInfo {
    pub provider_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAccountInfoRequest {
    pub local_id: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAccountInfoResponse {
    pub users: Option<Vec<UserRecord>>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub local_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<String>,
}
