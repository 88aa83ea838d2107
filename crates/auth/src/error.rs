use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No identity is established for the current session.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("username must not be empty")]
    EmptyUsername,

    /// Signature, encoding or subject is unusable.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}
