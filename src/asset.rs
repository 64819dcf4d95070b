use near_sdk::json_types::U128;
use near_sdk::{ext_contract, AccountId, Gas, NearToken, Promise, PromiseOrValue};

use crate::errors::HtlcError;

/// Exactly one yoctoNEAR, required by the token standards on transfers.
pub const ONE_YOCTO: NearToken = NearToken::from_yoctonear(1);

pub const GAS_FOR_LEDGER_CALL: Gas = Gas::from_tgas(20);
pub const GAS_FOR_TRANSFER_CALL: Gas = Gas::from_tgas(50);
pub const GAS_FOR_RESOLVE: Gas = Gas::from_tgas(10);

// Callbacks every HTLC contract exposes to resolve a pending transition.
#[ext_contract(ext_htlc)]
pub trait HtlcCallbacks {
    fn on_escrowed(&mut self) -> bool;
    fn on_settled(&mut self) -> bool;
}

/// How the escrowed asset reached the contract.
pub enum Deposit {
    /// The asset was attached to the call itself.
    Received,
    /// The asset is being pulled from the owner by a ledger call.
    Pull(Promise),
}

/// Moves one kind of asset in and out of a swap instance.
pub trait AssetBinding {
    /// Human-readable identification of the locked asset, used in logs.
    fn describe(&self) -> String;

    /// Escrows the asset from `owner` into this contract.
    fn escrow(&self, owner: &AccountId) -> Result<Deposit, HtlcError>;

    /// Releases the escrowed asset to the counter-claimant.
    fn release_to(&self, recipient: AccountId) -> Promise;

    /// Returns the escrowed asset to the depositor.
    fn release_back(&self, owner: AccountId) -> Promise {
        self.release_to(owner)
    }
}

/// Receipt hook answer for NEP-171 `nft_on_transfer`: keep the token.
pub fn accept_nft() -> PromiseOrValue<bool> {
    PromiseOrValue::Value(false)
}

/// Receipt hook answer for NEP-245 `mt_on_transfer`: refund nothing.
pub fn accept_mt(amounts: &[U128]) -> PromiseOrValue<Vec<U128>> {
    PromiseOrValue::Value(vec![U128(0); amounts.len()])
}
