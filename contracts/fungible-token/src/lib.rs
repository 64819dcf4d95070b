use near_sdk::json_types::{Base58CryptoHash, U128};
use near_sdk::{
    env, near, require, AccountId, PanicOnDefault, Promise, PromiseError, PromiseOrValue,
    Timestamp,
};

use near_htlc::timelocks;
use near_htlc::{abort, Htlc, HtlcError, Parties, SwapView};

mod asset;

pub use asset::FtAsset;

/// A swap of NEP-141 fungible tokens.
///
/// The owner must let this contract pull `amount` of the token before
/// funding, and this contract must be registered with the token for storage.
#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    htlc: Htlc<FtAsset>,
}

#[near]
impl Contract {
    #[init]
    pub fn new(token_id: AccountId, other_party: AccountId, amount: U128) -> Self {
        require!(amount.0 > 0, "Swap amount must be positive");
        let parties = Parties::new(env::predecessor_account_id(), other_party)
            .unwrap_or_else(|err| abort(err));
        Self {
            htlc: Htlc::new(parties, FtAsset { token_id, amount }),
        }
    }

    pub fn fund(
        &mut self,
        hash_key: Base58CryptoHash,
        deadline: Timestamp,
        is_initiator: bool,
    ) -> PromiseOrValue<bool> {
        self.htlc
            .fund(
                &env::predecessor_account_id(),
                hash_key.into(),
                deadline,
                is_initiator,
                timelocks::now(),
            )
            .unwrap_or_else(|err| abort(err))
    }

    pub fn confirm(&mut self, key: String) -> Promise {
        self.htlc
            .confirm(&env::predecessor_account_id(), key, timelocks::now())
            .unwrap_or_else(|err| abort(err))
    }

    pub fn reclaim(&mut self) -> Promise {
        self.htlc
            .reclaim(&env::predecessor_account_id(), timelocks::now())
            .unwrap_or_else(|err| abort(err))
    }

    pub fn transfer_ownership(&mut self, new_owner: AccountId) {
        self.htlc
            .transfer_ownership(&env::predecessor_account_id(), new_owner)
            .unwrap_or_else(|err| abort(err))
    }

    pub fn get_swap(&self) -> SwapView<FtAsset> {
        self.htlc.view()
    }

    // --- PRIVATE CALLBACKS ---
    #[private]
    pub fn on_escrowed(&mut self, #[callback_result] result: Result<(), PromiseError>) -> bool {
        let escrowed = result.is_ok();
        self.htlc.resolve_pending(escrowed);
        escrowed
    }

    /// Second half of a release: forwards the whole balance read from the
    /// token. Panicking here fails the settlement, which `on_settled` rolls back.
    #[private]
    pub fn on_balance_read(
        &mut self,
        #[callback_result] balance: Result<U128, PromiseError>,
        recipient: AccountId,
    ) -> Promise {
        let balance = balance.unwrap_or_else(|_| abort(HtlcError::AssetTransferFailed));
        self.htlc.asset.transfer(recipient, balance)
    }

    #[private]
    pub fn on_settled(&mut self, #[callback_result] result: Result<(), PromiseError>) -> bool {
        let settled = result.is_ok();
        self.htlc.resolve_pending(settled);
        settled
    }
}
