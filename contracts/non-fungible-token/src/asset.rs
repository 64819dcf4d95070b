use near_sdk::{env, ext_contract, near, AccountId, Promise};

use near_htlc::asset::{GAS_FOR_LEDGER_CALL, GAS_FOR_TRANSFER_CALL, ONE_YOCTO};
use near_htlc::{AssetBinding, Deposit, HtlcError};

pub type TokenId = String;

// External contract interfaces
#[ext_contract(ext_non_fungible_token)]
pub trait NonFungibleToken {
    fn nft_transfer(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        approval_id: Option<u64>,
        memo: Option<String>,
    );
    fn nft_transfer_call(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        approval_id: Option<u64>,
        memo: Option<String>,
        msg: String,
    ) -> bool;
}

/// A single token `token_id` of the NEP-171 contract at `nft_contract`.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct NftAsset {
    pub nft_contract: AccountId,
    pub token_id: TokenId,
    /// NEP-178 approval the owner granted this contract, if it pins one.
    pub approval_id: Option<u64>,
}

impl AssetBinding for NftAsset {
    fn describe(&self) -> String {
        format!("nft:{}:{}", self.nft_contract, self.token_id)
    }

    // A transfer call, so the ledger hands the token over only after this
    // contract's `nft_on_transfer` accepts it.
    fn escrow(&self, _owner: &AccountId) -> Result<Deposit, HtlcError> {
        Ok(Deposit::Pull(
            ext_non_fungible_token::ext(self.nft_contract.clone())
                .with_attached_deposit(ONE_YOCTO)
                .with_static_gas(GAS_FOR_TRANSFER_CALL)
                .nft_transfer_call(
                    env::current_account_id(),
                    self.token_id.clone(),
                    self.approval_id,
                    Some("HTLC escrow".to_string()),
                    String::new(),
                ),
        ))
    }

    fn release_to(&self, recipient: AccountId) -> Promise {
        ext_non_fungible_token::ext(self.nft_contract.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_LEDGER_CALL)
            .nft_transfer(
                recipient,
                self.token_id.clone(),
                None,
                Some("HTLC release".to_string()),
            )
    }
}
