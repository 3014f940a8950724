use thiserror::Error;

/// Failures while creating a user record.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("login name already taken")]
    NameTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outcome of checking a submitted verification code against the
/// session's pending state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("no verification in progress")]
    NoPending,
    #[error("verification code expired")]
    Expired,
    #[error("wrong verification code")]
    Mismatch,
}
