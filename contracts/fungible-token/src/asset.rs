use near_sdk::json_types::U128;
use near_sdk::{env, ext_contract, near, AccountId, Gas, Promise};

use near_htlc::asset::{GAS_FOR_LEDGER_CALL, ONE_YOCTO};
use near_htlc::{AssetBinding, Deposit, HtlcError};

const GAS_FOR_BALANCE_READ: Gas = Gas::from_tgas(40);

// External contract interfaces
#[ext_contract(ext_fungible_token)]
pub trait FungibleToken {
    fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>);
    fn ft_transfer_from(
        &mut self,
        owner_id: AccountId,
        new_owner_id: AccountId,
        amount: U128,
        memo: Option<String>,
    );
    fn ft_balance_of(&self, account_id: AccountId) -> U128;
}

#[ext_contract(ext_self)]
pub trait BalanceCallbacks {
    fn on_balance_read(&mut self, recipient: AccountId);
}

/// `amount` units of the NEP-141 token at `token_id`.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct FtAsset {
    pub token_id: AccountId,
    pub amount: U128,
}

impl FtAsset {
    /// Sends `amount` (the balance read back from the ledger) to `recipient`.
    pub fn transfer(&self, recipient: AccountId, amount: U128) -> Promise {
        ext_fungible_token::ext(self.token_id.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_LEDGER_CALL)
            .ft_transfer(recipient, amount, Some("HTLC release".to_string()))
    }
}

impl AssetBinding for FtAsset {
    fn describe(&self) -> String {
        format!("ft:{}:{}", self.token_id, self.amount.0)
    }

    // Pulls through the allowance the owner granted this contract.
    fn escrow(&self, owner: &AccountId) -> Result<Deposit, HtlcError> {
        Ok(Deposit::Pull(
            ext_fungible_token::ext(self.token_id.clone())
                .with_attached_deposit(ONE_YOCTO)
                .with_static_gas(GAS_FOR_LEDGER_CALL)
                .ft_transfer_from(
                    owner.clone(),
                    env::current_account_id(),
                    self.amount,
                    Some("HTLC escrow".to_string()),
                ),
        ))
    }

    // Releases whatever this contract holds of the token, not the recorded amount.
    fn release_to(&self, recipient: AccountId) -> Promise {
        ext_fungible_token::ext(self.token_id.clone())
            .with_static_gas(GAS_FOR_LEDGER_CALL)
            .ft_balance_of(env::current_account_id())
            .then(
                ext_self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_BALANCE_READ)
                    .on_balance_read(recipient),
            )
    }
}
