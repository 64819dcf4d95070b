use near_sdk::json_types::U128;
use near_sdk::{env, ext_contract, near, AccountId, Promise};

use near_htlc::asset::{GAS_FOR_LEDGER_CALL, GAS_FOR_TRANSFER_CALL, ONE_YOCTO};
use near_htlc::{AssetBinding, Deposit, HtlcError};

pub type TokenId = String;

// External contract interfaces
#[ext_contract(ext_multi_token)]
pub trait MultiToken {
    fn mt_transfer(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        amount: U128,
        approval: Option<(AccountId, u64)>,
        memo: Option<String>,
    );
    fn mt_transfer_call(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        amount: U128,
        approval: Option<(AccountId, u64)>,
        memo: Option<String>,
        msg: String,
    ) -> Vec<U128>;
}

/// `amount` of token `token_id` on the NEP-245 contract at `mt_contract`.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct MtAsset {
    pub mt_contract: AccountId,
    pub token_id: TokenId,
    pub amount: U128,
    /// Approval the owner granted this contract, set when funding.
    pub approval_id: Option<u64>,
}

impl MtAsset {
    /// Whether the amounts the ledger reports as transferred match the escrow.
    pub fn fully_transferred(&self, transferred: &[U128]) -> bool {
        matches!(transferred, [moved] if *moved == self.amount)
    }
}

impl AssetBinding for MtAsset {
    fn describe(&self) -> String {
        format!("mt:{}:{}:{}", self.mt_contract, self.token_id, self.amount.0)
    }

    fn escrow(&self, owner: &AccountId) -> Result<Deposit, HtlcError> {
        Ok(Deposit::Pull(
            ext_multi_token::ext(self.mt_contract.clone())
                .with_attached_deposit(ONE_YOCTO)
                .with_static_gas(GAS_FOR_TRANSFER_CALL)
                .mt_transfer_call(
                    env::current_account_id(),
                    self.token_id.clone(),
                    self.amount,
                    self.approval_id.map(|id| (owner.clone(), id)),
                    Some("HTLC escrow".to_string()),
                    String::new(),
                ),
        ))
    }

    fn release_to(&self, recipient: AccountId) -> Promise {
        ext_multi_token::ext(self.mt_contract.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_LEDGER_CALL)
            .mt_transfer(
                recipient,
                self.token_id.clone(),
                self.amount,
                None,
                Some("HTLC release".to_string()),
            )
    }
}
