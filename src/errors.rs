use thiserror::Error;

/// Reasons a swap operation is rejected. Every variant aborts the whole call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HtlcError {
    #[error("Unauthorized: caller is not allowed to perform this operation")]
    Unauthorized,
    #[error("Owner and other party must be distinct accounts")]
    InvalidParties,
    #[error("Swap can only be funded while created or after a reclaim")]
    NotFundable,
    #[error("Swap is not funded")]
    NotFunded,
    #[error("Ownership cannot change while an asset is escrowed")]
    OwnershipLocked,
    #[error("Deadline must be in the future")]
    DeadlineNotInFuture,
    #[error("Attached deposit does not match the swap amount")]
    IncorrectDepositAmount,
    #[error("Invalid key: hash of the secret does not match the hash key")]
    InvalidKey,
    #[error("Deadline has passed, confirmation is closed")]
    DeadlineExpired,
    #[error("Deadline has not passed yet, reclaim is not available")]
    NotYetExpired,
    #[error("Asset transfer failed")]
    AssetTransferFailed,
}
