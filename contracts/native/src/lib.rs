use near_sdk::json_types::Base58CryptoHash;
use near_sdk::{
    env, near, require, AccountId, NearToken, PanicOnDefault, Promise, PromiseError,
    PromiseOrValue, Timestamp,
};

use near_htlc::timelocks;
use near_htlc::{abort, Htlc, Parties, SwapView};

mod asset;

pub use asset::NativeAsset;

/// A swap of native NEAR. The owner attaches exactly `amount` when funding.
#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    htlc: Htlc<NativeAsset>,
}

#[near]
impl Contract {
    #[init]
    pub fn new(other_party: AccountId, amount: NearToken) -> Self {
        require!(!amount.is_zero(), "Swap amount must be positive");
        let parties = Parties::new(env::predecessor_account_id(), other_party)
            .unwrap_or_else(|err| abort(err));
        Self {
            htlc: Htlc::new(parties, NativeAsset { amount }),
        }
    }

    /// Deploys and escrows in one step: the deposit attached to the
    /// initialization call is the locked amount.
    #[init]
    #[payable]
    pub fn new_funded(
        other_party: AccountId,
        amount: NearToken,
        hash_key: Base58CryptoHash,
        deadline: Timestamp,
        is_initiator: bool,
    ) -> Self {
        let mut contract = Self::new(other_party, amount);
        contract.fund(hash_key, deadline, is_initiator);
        contract
    }

    #[payable]
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

    pub fn get_swap(&self) -> SwapView<NativeAsset> {
        self.htlc.view()
    }

    // --- PRIVATE CALLBACKS ---
    #[private]
    pub fn on_settled(&mut self, #[callback_result] result: Result<(), PromiseError>) -> bool {
        let settled = result.is_ok();
        self.htlc.resolve_pending(settled);
        settled
    }
}
