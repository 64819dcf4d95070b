use near_sdk::{env, near, AccountId, NearToken, Promise};

use near_htlc::{AssetBinding, Deposit, HtlcError};

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct NativeAsset {
    pub amount: NearToken,
}

impl AssetBinding for NativeAsset {
    fn describe(&self) -> String {
        format!("native:{}", self.amount.as_yoctonear())
    }

    fn escrow(&self, _owner: &AccountId) -> Result<Deposit, HtlcError> {
        if env::attached_deposit() != self.amount {
            return Err(HtlcError::IncorrectDepositAmount);
        }
        Ok(Deposit::Received)
    }

    // The recorded amount rather than the account balance: the balance also
    // covers this contract's storage stake.
    fn release_to(&self, recipient: AccountId) -> Promise {
        Promise::new(recipient).transfer(self.amount)
    }
}
