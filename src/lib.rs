//! Hashed timelock swap core shared by the HTLC contracts.
//!
//! Each contract in this workspace is a single swap instance between an owner
//! (the depositor) and an other party (the claimant). The owner funds the
//! instance with a hash key and a deadline, the other party confirms with the
//! secret before the deadline, and the owner reclaims after it.
//!
//! The contracts only differ in how the asset moves, which is captured by
//! [`AssetBinding`]. Everything else lives in [`Htlc`].

pub mod access;
pub mod asset;
pub mod errors;
pub mod htlc;
pub mod timelocks;
pub mod utils;

pub use access::{Parties, Role};
pub use asset::{AssetBinding, Deposit};
pub use errors::HtlcError;
pub use htlc::{Htlc, Phase, SwapView};
pub use timelocks::{Commitment, ONE_DAY};

/// Aborts the current call with the error's message, reverting the receipt.
pub fn abort(err: HtlcError) -> ! {
    near_sdk::env::panic_str(&err.to_string())
}
