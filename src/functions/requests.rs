//! Request and response DTOs for the callable operations, one validator per
//! operation. Validation runs before any handler logic; everything it
//! rejects surfaces as `invalid-argument`.

use super::CallableError;
use crate::entitlements::PLATFORM_ANDROID;
use crate::memberships::models::{MemberRole, MemberStatus};
use serde::{Deserialize, Serialize};

fn require_field(value: &str, name: &str) -> Result<(), CallableError> {
    if value.trim().is_empty() {
        return Err(CallableError::InvalidArgument(format!(
            "missing required field '{}'",
            name
        )));
    }
    Ok(())
}

pub(crate) fn parse_member_role(raw: &str) -> Result<MemberRole, CallableError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|_| {
        CallableError::InvalidArgument(format!(
            "role must be one of viewer/analyst/editor/admin/owner, got '{}'",
            raw
        ))
    })
}

pub(crate) fn parse_member_status(raw: &str) -> Result<MemberStatus, CallableError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|_| {
        CallableError::InvalidArgument(format!(
            "status must be active or inactive, got '{}'",
            raw
        ))
    })
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifySubscriptionRequest {
    pub tenant_id: String,
    pub product_id: String,
    pub purchase_token: String,
    pub platform: String,
    pub guard_token: Option<String>,
}

impl VerifySubscriptionRequest {
    pub fn validate(&self) -> Result<(), CallableError> {
        require_field(&self.tenant_id, "tenantId")?;
        require_field(&self.product_id, "productId")?;
        require_field(&self.purchase_token, "purchaseToken")?;
        if self.platform != PLATFORM_ANDROID {
            return Err(CallableError::InvalidArgument(format!(
                "unsupported platform '{}'",
                self.platform
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifySubscriptionResponse {
    pub active: bool,
    pub renewal_date: Option<i64>,
    pub roles_updated: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinTenantRequest {
    pub tenant_id: String,
    pub guard_token: Option<String>,
}

impl JoinTenantRequest {
    pub fn validate(&self) -> Result<(), CallableError> {
        require_field(&self.tenant_id, "tenantId")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinTenantResponse {
    pub role: MemberRole,
    pub status: MemberStatus,
    pub already_member: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetMemberRoleRequest {
    pub tenant_id: String,
    pub target_uid: String,
    pub role: String,
    pub status: String,
}

impl SetMemberRoleRequest {
    pub fn validate(&self) -> Result<(MemberRole, MemberStatus), CallableError> {
        require_field(&self.tenant_id, "tenantId")?;
        require_field(&self.target_uid, "targetUid")?;
        let role = parse_member_role(&self.role)?;
        let status = parse_member_status(&self.status)?;
        Ok((role, status))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetMemberAccessRequest {
    pub tenant_id: String,
    pub target_uid: String,
    /// Toggle for the "jw" feature-role tag.
    pub jw: Option<bool>,
    /// Toggle for the manual premium grant.
    pub premium: Option<bool>,
}

impl SetMemberAccessRequest {
    pub fn validate(&self) -> Result<(), CallableError> {
        require_field(&self.tenant_id, "tenantId")?;
        require_field(&self.target_uid, "targetUid")?;
        if self.jw.is_none() && self.premium.is_none() {
            return Err(CallableError::InvalidArgument(
                "at least one of 'jw' or 'premium' must be given".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetMemberAccessResponse {
    pub feature_roles: Vec<String>,
    pub premium_active: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberProfileRequest {
    pub tenant_id: String,
    pub target_uid: String,
    pub display_name: String,
    pub country: Option<String>,
    pub hearing_status: Option<String>,
}

impl UpdateMemberProfileRequest {
    pub fn validate(&self) -> Result<(), CallableError> {
        require_field(&self.tenant_id, "tenantId")?;
        require_field(&self.target_uid, "targetUid")?;
        require_field(&self.display_name, "displayName")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefreshMemberProfileRequest {
    pub tenant_id: String,
    pub target_uid: String,
}

impl RefreshMemberProfileRequest {
    pub fn validate(&self) -> Result<(), CallableError> {
        require_field(&self.tenant_id, "tenantId")?;
        require_field(&self.target_uid, "targetUid")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRolesResponse {
    pub active: bool,
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetCustomClaimsRequest {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl SetCustomClaimsRequest {
    pub fn validate(&self) -> Result<(), CallableError> {
        require_field(&self.user_id, "userId")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetCustomClaimsResponse {
    pub roles: Vec<String>,
    pub changed: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PurgeWordMediaRequest {
    pub tenant_id: String,
    pub word_id: String,
}

impl PurgeWordMediaRequest {
    pub fn validate(&self) -> Result<(), CallableError> {
        require_field(&self.tenant_id, "tenantId")?;
        require_field(&self.word_id, "wordId")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PurgeWordMediaResponse {
    pub deleted: usize,
}
