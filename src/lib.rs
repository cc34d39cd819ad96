//! Tenant entitlement and role-reconciliation backend.
//!
//! Keeps three independently mutable sources of truth consistent (store
//! purchase verification results, admin-granted manual premium, and the
//! denormalized membership/index records) and mirrors the authoritative
//! role list into identity-provider custom claims.

pub mod auth;
pub mod core;
pub mod entitlements;
pub mod firestore;
pub mod functions;
pub mod memberships;
pub mod play;
pub mod profiles;
pub mod roles;
pub mod storage;
pub mod tenants;

use auth::verifier::IdTokenVerifier;
use auth::IdentityClient;
use firestore::Firestore;
use functions::compat::DefaultTenantMirror;
use functions::{Callables, ServiceConfig};
use play::SubscriptionVerifier;
use roles::ClaimsSync;
use std::sync::Arc;
use storage::MediaStore;
use yup_oauth2::ServiceAccountKey;

/// Root handle wiring a service-account key and service config into the
/// per-concern clients.
pub struct App {
    key: ServiceAccountKey,
    config: ServiceConfig,
}

impl App {
    pub fn new(key: ServiceAccountKey, config: ServiceConfig) -> Self {
        Self { key, config }
    }

    pub fn firestore(&self) -> Firestore {
        Firestore::new(self.key.clone())
    }

    pub fn identity(&self) -> IdentityClient {
        IdentityClient::new(self.key.clone())
    }

    pub fn media_store(&self) -> MediaStore {
        MediaStore::new(self.key.clone(), self.config.media_bucket.clone())
    }

    pub fn subscription_verifier(&self) -> SubscriptionVerifier {
        SubscriptionVerifier::new(self.key.clone(), self.config.android_package_name.clone())
    }

    pub fn id_token_verifier(&self) -> IdTokenVerifier {
        IdTokenVerifier::new(self.key.project_id.clone().unwrap_or_default())
    }

    /// The callable operations with the production legacy shim and no abuse
    /// guard; embedders that need the guard wire `Callables::from_parts`
    /// themselves.
    pub fn callables(&self) -> Callables {
        let firestore = self.firestore();
        let identity = self.identity();
        let legacy = Arc::new(DefaultTenantMirror::new(
            self.config.default_tenant_id.clone(),
            firestore.clone(),
            ClaimsSync::new(identity.clone(), firestore.clone()),
        ));
        Callables::from_parts(
            firestore,
            identity,
            self.id_token_verifier(),
            self.subscription_verifier(),
            self.media_store(),
            legacy,
            None,
            self.config.clone(),
        )
    }
}
