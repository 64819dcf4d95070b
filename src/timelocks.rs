use near_sdk::{env, near, Timestamp};

use crate::errors::HtlcError;

pub const NANOS_IN_SEC: u64 = 1_000_000_000;

/// Extra time granted to the initiating side, in seconds.
///
/// The responder may reveal the secret at the very last second of its own
/// window; the initiator then still has this long to confirm the mirrored
/// swap before its own deadline.
pub const ONE_DAY: u64 = 24 * 60 * 60;

/// Current block time in whole seconds.
pub fn now() -> Timestamp {
    env::block_timestamp() / NANOS_IN_SEC
}

/// The effective deadline of a funded swap together with its hash key.
#[near(serializers = [borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    pub hash_key: near_sdk::CryptoHash,
    pub deadline: Timestamp,
}

impl Commitment {
    /// Validates the requested deadline against `now` and applies the
    /// initiator extension.
    pub fn new(
        hash_key: near_sdk::CryptoHash,
        requested_deadline: Timestamp,
        is_initiator: bool,
        now: Timestamp,
    ) -> Result<Self, HtlcError> {
        if requested_deadline <= now {
            return Err(HtlcError::DeadlineNotInFuture);
        }
        Ok(Self {
            hash_key,
            deadline: effective_deadline(requested_deadline, is_initiator),
        })
    }

    /// Confirmation is open up to and including the deadline.
    pub fn assert_confirm_window(&self, now: Timestamp) -> Result<(), HtlcError> {
        if now > self.deadline {
            return Err(HtlcError::DeadlineExpired);
        }
        Ok(())
    }

    /// Reclaim opens strictly after the deadline.
    pub fn assert_reclaim_window(&self, now: Timestamp) -> Result<(), HtlcError> {
        if now <= self.deadline {
            return Err(HtlcError::NotYetExpired);
        }
        Ok(())
    }

    pub fn matches(&self, secret: &str) -> bool {
        env::sha256_array(secret.as_bytes()) == self.hash_key
    }
}

pub fn effective_deadline(requested_deadline: Timestamp, is_initiator: bool) -> Timestamp {
    if is_initiator {
        requested_deadline.saturating_add(ONE_DAY)
    } else {
        requested_deadline
    }
}
