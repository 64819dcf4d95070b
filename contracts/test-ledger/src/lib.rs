//! A small ledger speaking the parts of NEP-141, NEP-171/178 and NEP-245 the
//! HTLC contracts call. Anyone can mint and no storage registration is needed.
//! Used by the sandbox tests only.

use near_sdk::json_types::U128;
use near_sdk::store::LookupMap;
use near_sdk::{
    assert_one_yocto, env, ext_contract, log, near, require, AccountId, Gas, PanicOnDefault,
    PromiseError, PromiseOrValue,
};

pub type TokenId = String;

const GAS_FOR_RECEIVER: Gas = Gas::from_tgas(15);
const GAS_FOR_RESOLVE_TRANSFER: Gas = Gas::from_tgas(10);

// External contract interfaces
#[ext_contract(ext_nft_receiver)]
pub trait NonFungibleTokenReceiver {
    fn nft_on_transfer(
        &mut self,
        sender_id: AccountId,
        previous_owner_id: AccountId,
        token_id: TokenId,
        msg: String,
    ) -> PromiseOrValue<bool>;
}

#[ext_contract(ext_mt_receiver)]
pub trait MultiTokenReceiver {
    fn mt_on_transfer(
        &mut self,
        sender_id: AccountId,
        previous_owner_ids: Vec<AccountId>,
        token_ids: Vec<TokenId>,
        amounts: Vec<U128>,
        msg: String,
    ) -> PromiseOrValue<Vec<U128>>;
}

#[ext_contract(ext_self)]
pub trait TransferResolvers {
    fn nft_resolve_transfer(
        &mut self,
        previous_owner_id: AccountId,
        receiver_id: AccountId,
        token_id: TokenId,
    ) -> bool;
    fn mt_resolve_transfer(
        &mut self,
        previous_owner_id: AccountId,
        receiver_id: AccountId,
        token_id: TokenId,
        amount: U128,
    ) -> Vec<U128>;
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub token_id: TokenId,
    pub owner_id: AccountId,
}

#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Ledger {
    ft_balances: LookupMap<AccountId, u128>,
    /// (owner, spender) -> remaining allowance.
    ft_allowances: LookupMap<(AccountId, AccountId), u128>,
    nft_owners: LookupMap<TokenId, AccountId>,
    /// A single approval per token: (approved account, approval id).
    nft_approvals: LookupMap<TokenId, (AccountId, u64)>,
    mt_balances: LookupMap<(TokenId, AccountId), u128>,
    /// (token, owner) -> (approved account, approval id, approved amount).
    mt_approvals: LookupMap<(TokenId, AccountId), (AccountId, u64, u128)>,
    next_approval_id: u64,
}

#[near]
impl Ledger {
    #[init]
    pub fn new() -> Self {
        Self {
            ft_balances: LookupMap::new(b"f"),
            ft_allowances: LookupMap::new(b"a"),
            nft_owners: LookupMap::new(b"n"),
            nft_approvals: LookupMap::new(b"p"),
            mt_balances: LookupMap::new(b"m"),
            mt_approvals: LookupMap::new(b"q"),
            next_approval_id: 0,
        }
    }

    // --- FUNGIBLE TOKEN ---
    pub fn ft_mint(&mut self, account_id: AccountId, amount: U128) {
        let balance = self.ft_balance(&account_id);
        self.ft_balances.insert(account_id, balance + amount.0);
    }

    pub fn ft_balance_of(&self, account_id: AccountId) -> U128 {
        U128(self.ft_balance(&account_id))
    }

    /// Lets `contract_id` pull up to `amount` of the caller's balance.
    #[payable]
    pub fn ft_approve(&mut self, contract_id: AccountId, amount: U128) {
        assert_one_yocto();
        self.ft_allowances
            .insert((env::predecessor_account_id(), contract_id), amount.0);
    }

    #[payable]
    pub fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>) {
        assert_one_yocto();
        self.ft_move(&env::predecessor_account_id(), &receiver_id, amount.0);
        log_memo(memo);
    }

    #[payable]
    pub fn ft_transfer_from(
        &mut self,
        owner_id: AccountId,
        new_owner_id: AccountId,
        amount: U128,
        memo: Option<String>,
    ) {
        assert_one_yocto();
        let key = (owner_id.clone(), env::predecessor_account_id());
        let allowance = self.ft_allowances.get(&key).copied().unwrap_or(0);
        require!(allowance >= amount.0, "Allowance exceeded");
        self.ft_allowances.insert(key, allowance - amount.0);
        self.ft_move(&owner_id, &new_owner_id, amount.0);
        log_memo(memo);
    }

    // --- NON-FUNGIBLE TOKEN ---
    pub fn nft_mint(&mut self, token_id: TokenId, owner_id: AccountId) {
        require!(
            !self.nft_owners.contains_key(&token_id),
            "Token already exists"
        );
        self.nft_owners.insert(token_id, owner_id);
    }

    pub fn nft_token(&self, token_id: TokenId) -> Option<Token> {
        self.nft_owners.get(&token_id).map(|owner_id| Token {
            token_id,
            owner_id: owner_id.clone(),
        })
    }

    /// Approves `account_id` for the token and returns the approval id.
    /// Replaces any earlier approval.
    #[payable]
    pub fn nft_approve(&mut self, token_id: TokenId, account_id: AccountId) -> u64 {
        assert_one_yocto();
        let owner = self.nft_owner(&token_id);
        require!(
            owner == env::predecessor_account_id(),
            "Only the token owner can approve"
        );
        let approval_id = self.issue_approval_id();
        self.nft_approvals.insert(token_id, (account_id, approval_id));
        approval_id
    }

    #[payable]
    pub fn nft_transfer(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        approval_id: Option<u64>,
        memo: Option<String>,
    ) {
        assert_one_yocto();
        self.nft_move(
            &env::predecessor_account_id(),
            &receiver_id,
            &token_id,
            approval_id,
        );
        log_memo(memo);
    }

    #[payable]
    pub fn nft_transfer_call(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        approval_id: Option<u64>,
        memo: Option<String>,
        msg: String,
    ) -> PromiseOrValue<bool> {
        assert_one_yocto();
        let sender_id = env::predecessor_account_id();
        let previous_owner_id = self.nft_move(&sender_id, &receiver_id, &token_id, approval_id);
        log_memo(memo);

        ext_nft_receiver::ext(receiver_id.clone())
            .with_static_gas(GAS_FOR_RECEIVER)
            .nft_on_transfer(sender_id, previous_owner_id.clone(), token_id.clone(), msg)
            .then(
                ext_self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_RESOLVE_TRANSFER)
                    .nft_resolve_transfer(previous_owner_id, receiver_id, token_id),
            )
            .into()
    }

    /// Returns `true` if the receiver kept the token.
    #[private]
    pub fn nft_resolve_transfer(
        &mut self,
        #[callback_result] must_return: Result<bool, PromiseError>,
        previous_owner_id: AccountId,
        receiver_id: AccountId,
        token_id: TokenId,
    ) -> bool {
        if matches!(must_return, Ok(false)) {
            return true;
        }
        // Already moved on by the receiver.
        if self.nft_owners.get(&token_id) != Some(&receiver_id) {
            return true;
        }
        log!("Returning token {} to {}", token_id, previous_owner_id);
        self.nft_owners.insert(token_id, previous_owner_id);
        false
    }

    // --- MULTI TOKEN ---
    pub fn mt_mint(&mut self, token_id: TokenId, account_id: AccountId, amount: U128) {
        let balance = self.mt_balance(&token_id, &account_id);
        self.mt_balances
            .insert((token_id, account_id), balance + amount.0);
    }

    pub fn mt_balance_of(&self, account_id: AccountId, token_id: TokenId) -> U128 {
        U128(self.mt_balance(&token_id, &account_id))
    }

    /// Lets `account_id` move up to `amount` of the caller's `token_id` and
    /// returns the approval id.
    #[payable]
    pub fn mt_approve(&mut self, token_id: TokenId, amount: U128, account_id: AccountId) -> u64 {
        assert_one_yocto();
        let approval_id = self.issue_approval_id();
        self.mt_approvals.insert(
            (token_id, env::predecessor_account_id()),
            (account_id, approval_id, amount.0),
        );
        approval_id
    }

    #[payable]
    pub fn mt_transfer(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        amount: U128,
        approval: Option<(AccountId, u64)>,
        memo: Option<String>,
    ) {
        assert_one_yocto();
        self.mt_move(
            &env::predecessor_account_id(),
            &receiver_id,
            &token_id,
            amount.0,
            approval,
        );
        log_memo(memo);
    }

    #[payable]
    pub fn mt_transfer_call(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        amount: U128,
        approval: Option<(AccountId, u64)>,
        memo: Option<String>,
        msg: String,
    ) -> PromiseOrValue<Vec<U128>> {
        assert_one_yocto();
        let sender_id = env::predecessor_account_id();
        let previous_owner_id =
            self.mt_move(&sender_id, &receiver_id, &token_id, amount.0, approval);
        log_memo(memo);

        ext_mt_receiver::ext(receiver_id.clone())
            .with_static_gas(GAS_FOR_RECEIVER)
            .mt_on_transfer(
                sender_id,
                vec![previous_owner_id.clone()],
                vec![token_id.clone()],
                vec![amount],
                msg,
            )
            .then(
                ext_self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_RESOLVE_TRANSFER)
                    .mt_resolve_transfer(previous_owner_id, receiver_id, token_id, amount),
            )
            .into()
    }

    /// Refunds what the receiver declined and returns the amount it kept.
    #[private]
    pub fn mt_resolve_transfer(
        &mut self,
        #[callback_result] unused: Result<Vec<U128>, PromiseError>,
        previous_owner_id: AccountId,
        receiver_id: AccountId,
        token_id: TokenId,
        amount: U128,
    ) -> Vec<U128> {
        let declined = match unused {
            Ok(amounts) => amounts.first().map_or(amount.0, |a| a.0.min(amount.0)),
            Err(_) => amount.0,
        };
        let refund = declined.min(self.mt_balance(&token_id, &receiver_id));
        if refund > 0 {
            let held = self.mt_balance(&token_id, &receiver_id);
            self.mt_balances
                .insert((token_id.clone(), receiver_id), held - refund);
            let balance = self.mt_balance(&token_id, &previous_owner_id);
            self.mt_balances
                .insert((token_id, previous_owner_id), balance + refund);
        }
        vec![U128(amount.0 - refund)]
    }
}

impl Ledger {
    fn ft_balance(&self, account_id: &AccountId) -> u128 {
        self.ft_balances.get(account_id).copied().unwrap_or(0)
    }

    fn ft_move(&mut self, from: &AccountId, to: &AccountId, amount: u128) {
        require!(from != to, "Sender and receiver must differ");
        let balance = self.ft_balance(from);
        require!(balance >= amount, "Not enough balance");
        self.ft_balances.insert(from.clone(), balance - amount);
        let received = self.ft_balance(to);
        self.ft_balances.insert(to.clone(), received + amount);
    }

    fn nft_owner(&self, token_id: &TokenId) -> AccountId {
        self.nft_owners
            .get(token_id)
            .cloned()
            .unwrap_or_else(|| env::panic_str("Token not found"))
    }

    // Returns the previous owner.
    fn nft_move(
        &mut self,
        sender: &AccountId,
        receiver: &AccountId,
        token_id: &TokenId,
        approval_id: Option<u64>,
    ) -> AccountId {
        let owner = self.nft_owner(token_id);
        if *sender != owner {
            let approved = self
                .nft_approvals
                .get(token_id)
                .is_some_and(|(account, id)| {
                    account == sender && approval_id.map_or(true, |expected| expected == *id)
                });
            require!(approved, "Sender not approved");
        }
        require!(owner != *receiver, "Sender and receiver must differ");
        self.nft_approvals.remove(token_id);
        self.nft_owners.insert(token_id.clone(), receiver.clone());
        owner
    }

    fn mt_balance(&self, token_id: &TokenId, account_id: &AccountId) -> u128 {
        self.mt_balances
            .get(&(token_id.clone(), account_id.clone()))
            .copied()
            .unwrap_or(0)
    }

    // Moves from the approving owner when `approval` names one; returns the
    // account debited.
    fn mt_move(
        &mut self,
        sender: &AccountId,
        receiver: &AccountId,
        token_id: &TokenId,
        amount: u128,
        approval: Option<(AccountId, u64)>,
    ) -> AccountId {
        let owner = match approval {
            Some((owner_id, approval_id)) if owner_id != *sender => {
                self.spend_mt_approval(&owner_id, sender, token_id, approval_id, amount);
                owner_id
            }
            _ => sender.clone(),
        };
        require!(owner != *receiver, "Sender and receiver must differ");
        let balance = self.mt_balance(token_id, &owner);
        require!(balance >= amount, "Not enough balance");
        self.mt_balances
            .insert((token_id.clone(), owner.clone()), balance - amount);
        let received = self.mt_balance(token_id, receiver);
        self.mt_balances
            .insert((token_id.clone(), receiver.clone()), received + amount);
        owner
    }

    fn spend_mt_approval(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        token_id: &TokenId,
        approval_id: u64,
        amount: u128,
    ) {
        let key = (token_id.clone(), owner.clone());
        let (account, id, allowance) = self
            .mt_approvals
            .get(&key)
            .cloned()
            .unwrap_or_else(|| env::panic_str("Sender not approved"));
        require!(
            account == *spender && id == approval_id,
            "Sender not approved"
        );
        require!(allowance >= amount, "Approved amount exceeded");
        self.mt_approvals
            .insert(key, (account, id, allowance - amount));
    }

    fn issue_approval_id(&mut self) -> u64 {
        self.next_approval_id += 1;
        self.next_approval_id
    }
}

fn log_memo(memo: Option<String>) {
    if let Some(memo) = memo {
        log!("Memo: {}", memo);
    }
}
