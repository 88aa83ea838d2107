//! Sources of the current owner id.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use voucherdesk_core::OwnerId;

use crate::claims::{validate_claims, SessionClaims};
use crate::AuthError;

/// Supplies the owner every voucher operation is scoped to.
pub trait IdentityProvider: Send + Sync {
    fn current_owner(&self) -> Result<OwnerId, AuthError>;
}

/// Username-only login for a single-user local instance.
#[derive(Debug, Default)]
pub struct LocalIdentity {
    current: RwLock<Option<OwnerId>>,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trimmed username becomes the owner id; replaces any previous login.
    pub fn login(&self, username: &str) -> Result<OwnerId, AuthError> {
        let owner = OwnerId::parse(username).map_err(|_| AuthError::EmptyUsername)?;
        let mut current = self.current.write().unwrap_or_else(|p| p.into_inner());
        *current = Some(owner.clone());
        tracing::info!(owner_id = %owner, "local login");
        Ok(owner)
    }

    pub fn logout(&self) {
        let mut current = self.current.write().unwrap_or_else(|p| p.into_inner());
        if let Some(owner) = current.take() {
            tracing::info!(owner_id = %owner, "local logout");
        }
    }
}

impl IdentityProvider for LocalIdentity {
    fn current_owner(&self) -> Result<OwnerId, AuthError> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(AuthError::NotAuthenticated)
    }
}

/// Identity established from validated bearer token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    owner_id: OwnerId,
    email: Option<String>,
    expires_at: DateTime<Utc>,
}

impl SessionIdentity {
    pub fn from_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<Self, AuthError> {
        validate_claims(claims, now)?;
        let owner_id = OwnerId::parse(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("empty subject".into()))?;
        Ok(Self {
            owner_id,
            email: claims.email.clone(),
            expires_at: claims.expires_at,
        })
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the session is still usable at `now`.
    pub fn owner_at(&self, now: DateTime<Utc>) -> Result<OwnerId, AuthError> {
        if now >= self.expires_at {
            return Err(AuthError::Expired);
        }
        Ok(self.owner_id.clone())
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_owner(&self) -> Result<OwnerId, AuthError> {
        self.owner_at(Utc::now())
    }
}
