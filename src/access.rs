use near_sdk::{near, AccountId};

use crate::errors::HtlcError;

#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The depositor: funds and reclaims.
    Owner,
    /// The counter-claimant: confirms with the secret.
    OtherParty,
}

/// The two principals of a swap instance.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parties {
    pub owner: AccountId,
    pub other_party: AccountId,
}

impl Parties {
    pub fn new(owner: AccountId, other_party: AccountId) -> Result<Self, HtlcError> {
        if owner == other_party {
            return Err(HtlcError::InvalidParties);
        }
        Ok(Self { owner, other_party })
    }

    /// Returns the role `caller` holds in this swap.
    pub fn authorize(&self, caller: &AccountId) -> Result<Role, HtlcError> {
        if *caller == self.owner {
            Ok(Role::Owner)
        } else if *caller == self.other_party {
            Ok(Role::OtherParty)
        } else {
            Err(HtlcError::Unauthorized)
        }
    }

    pub fn require(&self, caller: &AccountId, role: Role) -> Result<(), HtlcError> {
        if self.authorize(caller)? != role {
            return Err(HtlcError::Unauthorized);
        }
        Ok(())
    }
}
