use chrono::{DateTime, Utc};

use voucherdesk_auth::{AuthError, IdentityProvider, SessionIdentity};
use voucherdesk_core::OwnerId;

/// Authenticated session for a request.
///
/// Must be present for every voucher route; the owner is never taken from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    identity: SessionIdentity,
}

impl SessionContext {
    pub fn new(identity: SessionIdentity) -> Self {
        Self { identity }
    }

    pub fn owner(&self) -> Result<OwnerId, AuthError> {
        self.identity.current_owner()
    }

    pub fn email(&self) -> Option<&str> {
        self.identity.email()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.identity.expires_at()
    }
}
