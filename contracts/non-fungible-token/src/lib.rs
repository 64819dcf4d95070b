use near_sdk::json_types::Base58CryptoHash;
use near_sdk::{
    env, log, near, require, AccountId, PanicOnDefault, Promise, PromiseError, PromiseOrValue,
    Timestamp,
};

use near_htlc::asset::accept_nft;
use near_htlc::timelocks;
use near_htlc::{abort, Htlc, Parties, SwapView};

mod asset;

pub use asset::{NftAsset, TokenId};

/// A swap of one NEP-171 token.
///
/// The owner approves this contract for `token_id` (NEP-178) before funding.
#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    htlc: Htlc<NftAsset>,
}

#[near]
impl Contract {
    #[init]
    pub fn new(nft_contract: AccountId, other_party: AccountId, token_id: TokenId) -> Self {
        require!(!token_id.is_empty(), "Token id must not be empty");
        let parties = Parties::new(env::predecessor_account_id(), other_party)
            .unwrap_or_else(|err| abort(err));
        Self {
            htlc: Htlc::new(
                parties,
                NftAsset {
                    nft_contract,
                    token_id,
                    approval_id: None,
                },
            ),
        }
    }

    pub fn fund(
        &mut self,
        hash_key: Base58CryptoHash,
        deadline: Timestamp,
        is_initiator: bool,
        approval_id: Option<u64>,
    ) -> PromiseOrValue<bool> {
        let caller = env::predecessor_account_id();
        self.htlc
            .ensure_fundable(&caller)
            .unwrap_or_else(|err| abort(err));
        self.htlc.asset.approval_id = approval_id;
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

    pub fn get_swap(&self) -> SwapView<NftAsset> {
        self.htlc.view()
    }

    /// NEP-171 receiver hook. Always keeps the token.
    pub fn nft_on_transfer(
        &mut self,
        sender_id: AccountId,
        previous_owner_id: AccountId,
        token_id: TokenId,
        msg: String,
    ) -> PromiseOrValue<bool> {
        log!(
            "Received token {} of {} from {} (sender {}, msg '{}')",
            token_id,
            env::predecessor_account_id(),
            previous_owner_id,
            sender_id,
            msg
        );
        accept_nft()
    }

    // --- PRIVATE CALLBACKS ---

    // The ledger answers `true` only when the receiver kept the token.
    #[private]
    pub fn on_escrowed(&mut self, #[callback_result] result: Result<bool, PromiseError>) -> bool {
        let escrowed = matches!(result, Ok(true));
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
