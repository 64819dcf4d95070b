use near_sdk::json_types::{Base58CryptoHash, U128};
use near_sdk::{
    env, log, near, require, AccountId, PanicOnDefault, Promise, PromiseError, PromiseOrValue,
    Timestamp,
};

use near_htlc::asset::accept_mt;
use near_htlc::timelocks;
use near_htlc::{abort, Htlc, Parties, SwapView};

mod asset;

pub use asset::{MtAsset, TokenId};

/// A swap of `amount` units of one NEP-245 token.
#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    htlc: Htlc<MtAsset>,
}

#[near]
impl Contract {
    #[init]
    pub fn new(
        mt_contract: AccountId,
        other_party: AccountId,
        token_id: TokenId,
        amount: U128,
    ) -> Self {
        require!(amount.0 > 0, "Swap amount must be positive");
        let parties = Parties::new(env::predecessor_account_id(), other_party)
            .unwrap_or_else(|err| abort(err));
        Self {
            htlc: Htlc::new(
                parties,
                MtAsset {
                    mt_contract,
                    token_id,
                    amount,
                    approval_id: None,
                },
            ),
        }
    }

    /// `approval_id` is the approval the owner granted this contract on the
    /// token contract.
    pub fn fund(
        &mut self,
        hash_key: Base58CryptoHash,
        deadline: Timestamp,
        is_initiator: bool,
        approval_id: u64,
    ) -> PromiseOrValue<bool> {
        let caller = env::predecessor_account_id();
        self.htlc
            .ensure_fundable(&caller)
            .unwrap_or_else(|err| abort(err));
        self.htlc.asset.approval_id = Some(approval_id);
        self.htlc
            .fund(
                &caller,
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

    pub fn get_swap(&self) -> SwapView<MtAsset> {
        self.htlc.view()
    }

    /// NEP-245 receiver hook, used by both single and batch transfer calls.
    /// Keeps every amount.
    pub fn mt_on_transfer(
        &mut self,
        sender_id: AccountId,
        previous_owner_ids: Vec<AccountId>,
        token_ids: Vec<TokenId>,
        amounts: Vec<U128>,
        msg: String,
    ) -> PromiseOrValue<Vec<U128>> {
        log!(
            "Received {} token entries of {} from {:?} (sender {}, ids {:?}, msg '{}')",
            amounts.len(),
            env::predecessor_account_id(),
            previous_owner_ids,
            sender_id,
            token_ids,
            msg
        );
        accept_mt(&amounts)
    }

    // --- PRIVATE CALLBACKS ---
    #[private]
    pub fn on_escrowed(
        &mut self,
        #[callback_result] result: Result<Vec<U128>, PromiseError>,
    ) -> bool {
        let escrowed = result
            .map(|transferred| self.htlc.asset.fully_transferred(&transferred))
            .unwrap_or(false);
        self.htlc.resolve_pending(escrowed);
        escrowed
    }

    #[private]
    pub fn on_settled(&mut self, #[callback_result] result: Result<(), PromiseError>) -> bool {
        let settled = result.is_ok();
        self.htlc.resolve_pending(settled);
        settled
    }
}
