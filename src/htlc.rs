use near_sdk::json_types::Base58CryptoHash;
use near_sdk::{env, near, AccountId, CryptoHash, Promise, PromiseOrValue, Timestamp};

use crate::access::{Parties, Role};
use crate::asset::{ext_htlc, AssetBinding, Deposit, GAS_FOR_RESOLVE};
use crate::errors::HtlcError;
use crate::timelocks::Commitment;
use crate::utils::{encode_hash, log_htlc_event};

#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Deployed, nothing escrowed.
    Created,
    /// Waiting for the ledger to confirm the deposit.
    Funding,
    Funded,
    /// Waiting for the ledger to confirm the release.
    Settling,
    Confirmed,
    Reclaimed,
}

// A transition waiting on a ledger call. Holds what to restore if it fails.
#[near(serializers = [borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
struct Pending {
    commitment: Commitment,
    on_success: Phase,
    on_failure: Phase,
}

/// Hashed timelock state machine for a single swap instance.
///
/// Invariant: `commitment` is `Some` exactly while the phase is `Funded`.
#[near(serializers = [borsh])]
pub struct Htlc<A> {
    pub parties: Parties,
    pub asset: A,
    pub commitment: Option<Commitment>,
    /// The secret revealed by a successful confirmation.
    pub key: Option<String>,
    pub phase: Phase,
    pending: Option<Pending>,
}

/// JSON view of a swap, for counterparties inspecting the instance.
#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq)]
pub struct SwapView<A> {
    pub owner: AccountId,
    pub other_party: AccountId,
    pub asset: A,
    pub phase: Phase,
    pub hash_key: Option<Base58CryptoHash>,
    pub deadline: Option<Timestamp>,
    pub key: Option<String>,
}

impl<A: AssetBinding> Htlc<A> {
    pub fn new(parties: Parties, asset: A) -> Self {
        Self {
            parties,
            asset,
            commitment: None,
            key: None,
            phase: Phase::Created,
            pending: None,
        }
    }

    /// Stores the commitment and escrows the asset.
    ///
    /// A pulled deposit leaves the swap in `Funding` until `on_escrowed`
    /// resolves it with [`Htlc::resolve_pending`].
    pub fn fund(
        &mut self,
        caller: &AccountId,
        hash_key: CryptoHash,
        deadline: Timestamp,
        is_initiator: bool,
        now: Timestamp,
    ) -> Result<PromiseOrValue<bool>, HtlcError> {
        self.ensure_fundable(caller)?;
        let commitment = Commitment::new(hash_key, deadline, is_initiator, now)?;

        self.key = None;
        self.reset_swap_state();

        match self.asset.escrow(&self.parties.owner)? {
            Deposit::Received => {
                self.log_funded(&commitment);
                self.commitment = Some(commitment);
                self.phase = Phase::Funded;
                Ok(PromiseOrValue::Value(true))
            }
            Deposit::Pull(promise) => {
                log_htlc_event(
                    "FUNDING_STARTED",
                    &self.parties.owner,
                    &format!("asset='{}'", self.asset.describe()),
                );
                self.pending = Some(Pending {
                    commitment,
                    on_success: Phase::Funded,
                    on_failure: self.phase,
                });
                self.phase = Phase::Funding;
                Ok(promise
                    .then(
                        ext_htlc::ext(env::current_account_id())
                            .with_static_gas(GAS_FOR_RESOLVE)
                            .on_escrowed(),
                    )
                    .into())
            }
        }
    }

    /// Checks that `caller` may fund the swap in its current phase.
    pub fn ensure_fundable(&self, caller: &AccountId) -> Result<(), HtlcError> {
        self.parties.require(caller, Role::Owner)?;
        if !matches!(self.phase, Phase::Created | Phase::Reclaimed) {
            return Err(HtlcError::NotFundable);
        }
        Ok(())
    }

    /// Verifies the secret and releases the asset to the other party.
    pub fn confirm(
        &mut self,
        caller: &AccountId,
        secret: String,
        now: Timestamp,
    ) -> Result<Promise, HtlcError> {
        self.parties.require(caller, Role::OtherParty)?;
        let commitment = self.funded_commitment()?;
        if !commitment.matches(&secret) {
            return Err(HtlcError::InvalidKey);
        }
        commitment.assert_confirm_window(now)?;

        self.key = Some(secret);
        self.begin_settlement(commitment, Phase::Confirmed);

        Ok(self
            .asset
            .release_to(self.parties.other_party.clone())
            .then(Self::settled_callback()))
    }

    /// Returns the asset to the owner once the deadline has passed.
    pub fn reclaim(&mut self, caller: &AccountId, now: Timestamp) -> Result<Promise, HtlcError> {
        self.parties.require(caller, Role::Owner)?;
        let commitment = self.funded_commitment()?;
        commitment.assert_reclaim_window(now)?;

        self.begin_settlement(commitment, Phase::Reclaimed);

        Ok(self
            .asset
            .release_back(self.parties.owner.clone())
            .then(Self::settled_callback()))
    }

    /// Reassigns the owner. Only allowed while nothing is escrowed, so a
    /// pending reclaim can never be redirected.
    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<(), HtlcError> {
        self.parties.require(caller, Role::Owner)?;
        if !matches!(self.phase, Phase::Created | Phase::Reclaimed) {
            return Err(HtlcError::OwnershipLocked);
        }
        let parties = Parties::new(new_owner, self.parties.other_party.clone())?;
        log_htlc_event(
            "OWNERSHIP_TRANSFERRED",
            caller,
            &format!("new_owner='{}'", parties.owner),
        );
        self.parties = parties;
        Ok(())
    }

    /// Clears the commitment and any in-flight transition.
    pub fn reset_swap_state(&mut self) {
        self.commitment = None;
        self.pending = None;
    }

    /// Applies the outcome of the ledger call behind `Funding` or `Settling`.
    ///
    /// On failure the swap returns to exactly where it was before the call:
    /// no commitment after a failed deposit, the original commitment and no
    /// key after a failed release.
    pub fn resolve_pending(&mut self, succeeded: bool) -> Phase {
        let Some(pending) = self.pending.take() else {
            return self.phase;
        };
        let in_flight = self.phase;
        self.phase = if succeeded {
            pending.on_success
        } else {
            pending.on_failure
        };

        match (in_flight, succeeded) {
            (Phase::Funding, true) => {
                self.log_funded(&pending.commitment);
                self.commitment = Some(pending.commitment);
            }
            (Phase::Funding, false) => {
                log_htlc_event(
                    "FUNDING_FAILED",
                    &self.parties.owner,
                    &format!("reason='{}'", HtlcError::AssetTransferFailed),
                );
            }
            (_, true) if self.phase == Phase::Confirmed => {
                log_htlc_event(
                    "CONFIRMED",
                    &self.parties.other_party,
                    &format!(
                        "key='{}', hash_key='{}', asset='{}'",
                        self.key.as_deref().unwrap_or_default(),
                        encode_hash(&pending.commitment.hash_key),
                        self.asset.describe()
                    ),
                );
            }
            (_, true) => {
                log_htlc_event(
                    "RECLAIMED",
                    &self.parties.owner,
                    &format!(
                        "hash_key='{}', asset='{}'",
                        encode_hash(&pending.commitment.hash_key),
                        self.asset.describe()
                    ),
                );
            }
            (_, false) => {
                self.key = None;
                let actor = if pending.on_success == Phase::Confirmed {
                    &self.parties.other_party
                } else {
                    &self.parties.owner
                };
                log_htlc_event(
                    "SETTLEMENT_FAILED",
                    actor,
                    &format!(
                        "reason='{}', hash_key='{}'",
                        HtlcError::AssetTransferFailed,
                        encode_hash(&pending.commitment.hash_key)
                    ),
                );
                self.commitment = Some(pending.commitment);
            }
        }
        self.phase
    }

    pub fn view(&self) -> SwapView<A>
    where
        A: Clone,
    {
        SwapView {
            owner: self.parties.owner.clone(),
            other_party: self.parties.other_party.clone(),
            asset: self.asset.clone(),
            phase: self.phase,
            hash_key: self.commitment.as_ref().map(|c| c.hash_key.into()),
            deadline: self.commitment.as_ref().map(|c| c.deadline),
            key: self.key.clone(),
        }
    }

    fn funded_commitment(&self) -> Result<Commitment, HtlcError> {
        match (self.phase, &self.commitment) {
            (Phase::Funded, Some(commitment)) => Ok(commitment.clone()),
            _ => Err(HtlcError::NotFunded),
        }
    }

    fn begin_settlement(&mut self, commitment: Commitment, outcome: Phase) {
        self.reset_swap_state();
        self.pending = Some(Pending {
            commitment,
            on_success: outcome,
            on_failure: Phase::Funded,
        });
        self.phase = Phase::Settling;
    }

    fn settled_callback() -> Promise {
        ext_htlc::ext(env::current_account_id())
            .with_static_gas(GAS_FOR_RESOLVE)
            .on_settled()
    }

    fn log_funded(&self, commitment: &Commitment) {
        log_htlc_event(
            "FUNDED",
            &self.parties.owner,
            &format!(
                "hash_key='{}', deadline='{}', asset='{}'",
                encode_hash(&commitment.hash_key),
                commitment.deadline,
                self.asset.describe()
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timelocks::ONE_DAY;
    use near_sdk::test_utils::{accounts, get_logs};
    use near_sdk::{Gas, NearToken};
    use sha2::{Digest, Sha256};

    const T: Timestamp = 1_700_000_000;

    // Arrives with the call when `attached`, otherwise pulled from a ledger.
    #[derive(Clone)]
    struct TestAsset {
        attached: bool,
    }

    impl AssetBinding for TestAsset {
        fn describe(&self) -> String {
            "test:1".to_string()
        }

        fn escrow(&self, owner: &AccountId) -> Result<Deposit, HtlcError> {
            if self.attached {
                return Ok(Deposit::Received);
            }
            Ok(Deposit::Pull(
                Promise::new("ledger.near".parse().unwrap()).function_call(
                    "transfer_from".to_string(),
                    format!("{{\"owner_id\":\"{}\"}}", owner).into_bytes(),
                    NearToken::from_yoctonear(1),
                    Gas::from_tgas(5),
                ),
            ))
        }

        fn release_to(&self, recipient: AccountId) -> Promise {
            Promise::new(recipient).transfer(NearToken::from_yoctonear(1))
        }
    }

    fn hash_of(secret: &str) -> CryptoHash {
        Sha256::digest(secret.as_bytes()).into()
    }

    fn owner() -> AccountId {
        accounts(1)
    }

    fn other() -> AccountId {
        accounts(2)
    }

    fn htlc(attached: bool) -> Htlc<TestAsset> {
        Htlc::new(
            Parties::new(owner(), other()).unwrap(),
            TestAsset { attached },
        )
    }

    fn funded(is_initiator: bool) -> Htlc<TestAsset> {
        let mut htlc = htlc(true);
        htlc.fund(&owner(), hash_of("abc"), T + 600, is_initiator, T)
            .unwrap();
        htlc
    }

    #[test]
    fn fund_with_received_deposit_is_funded_immediately() {
        let htlc = funded(false);
        assert_eq!(htlc.phase, Phase::Funded);
        assert_eq!(
            htlc.commitment,
            Some(Commitment {
                hash_key: hash_of("abc"),
                deadline: T + 600
            })
        );
        assert!(get_logs().iter().any(|l| l.starts_with("HTLC_FUNDED")));
    }

    #[test]
    fn initiator_flag_extends_the_deadline_by_one_day() {
        assert_eq!(funded(true).commitment.unwrap().deadline, T + 600 + ONE_DAY);
        assert_eq!(funded(false).commitment.unwrap().deadline, T + 600);
    }

    #[test]
    fn only_owner_funds() {
        let mut htlc = htlc(true);
        assert_eq!(
            htlc.fund(&other(), hash_of("abc"), T + 600, true, T).err(),
            Some(HtlcError::Unauthorized)
        );
        assert_eq!(
            htlc.fund(&accounts(3), hash_of("abc"), T + 600, true, T).err(),
            Some(HtlcError::Unauthorized)
        );
        assert_eq!(htlc.phase, Phase::Created);
    }

    #[test]
    fn fundable_only_by_the_owner_before_or_after_a_round() {
        let mut htlc = htlc(true);
        assert_eq!(htlc.ensure_fundable(&owner()), Ok(()));
        assert_eq!(
            htlc.ensure_fundable(&other()),
            Err(HtlcError::Unauthorized)
        );
        htlc.fund(&owner(), hash_of("abc"), T + 600, false, T)
            .unwrap();
        assert_eq!(
            htlc.ensure_fundable(&owner()),
            Err(HtlcError::NotFundable)
        );
        htlc.reclaim(&owner(), T + 601).unwrap();
        htlc.resolve_pending(true);
        assert_eq!(htlc.ensure_fundable(&owner()), Ok(()));
    }

    #[test]
    fn fund_rejects_deadline_equal_to_now() {
        let mut htlc = htlc(true);
        assert_eq!(
            htlc.fund(&owner(), hash_of("abc"), T, false, T).err(),
            Some(HtlcError::DeadlineNotInFuture)
        );
        assert_eq!(htlc.phase, Phase::Created);
        assert_eq!(htlc.commitment, None);
    }

    #[test]
    fn cannot_fund_twice() {
        let mut htlc = funded(true);
        assert_eq!(
            htlc.fund(&owner(), hash_of("xyz"), T + 900, true, T).err(),
            Some(HtlcError::NotFundable)
        );
        assert_eq!(htlc.commitment.unwrap().hash_key, hash_of("abc"));
    }

    #[test]
    fn pulled_deposit_commits_only_after_the_ledger_succeeds() {
        let mut htlc = htlc(false);
        let result = htlc
            .fund(&owner(), hash_of("abc"), T + 600, false, T)
            .unwrap();
        assert!(matches!(result, PromiseOrValue::Promise(_)));
        assert_eq!(htlc.phase, Phase::Funding);
        assert_eq!(htlc.commitment, None);

        // Nothing else is accepted while the deposit is in flight.
        assert_eq!(
            htlc.confirm(&other(), "abc".to_string(), T).err(),
            Some(HtlcError::NotFunded)
        );
        assert_eq!(
            htlc.fund(&owner(), hash_of("abc"), T + 600, false, T).err(),
            Some(HtlcError::NotFundable)
        );

        assert_eq!(htlc.resolve_pending(true), Phase::Funded);
        assert_eq!(htlc.commitment.unwrap().deadline, T + 600);
    }

    #[test]
    fn failed_pull_stores_no_commitment() {
        let mut htlc = htlc(false);
        let _ = htlc.fund(&owner(), hash_of("abc"), T + 600, false, T).unwrap();
        assert_eq!(htlc.resolve_pending(false), Phase::Created);
        assert_eq!(htlc.commitment, None);
        assert!(get_logs()
            .iter()
            .any(|l| l.starts_with("HTLC_FUNDING_FAILED")));
    }

    #[test]
    fn confirm_with_the_right_secret_releases_and_records_the_key() {
        let mut htlc = funded(true);
        htlc.confirm(&other(), "abc".to_string(), T + 10).unwrap();
        assert_eq!(htlc.phase, Phase::Settling);
        assert_eq!(htlc.commitment, None);
        assert_eq!(htlc.key.as_deref(), Some("abc"));

        assert_eq!(htlc.resolve_pending(true), Phase::Confirmed);
        assert_eq!(htlc.key.as_deref(), Some("abc"));
        assert!(get_logs()
            .iter()
            .any(|l| l.starts_with("HTLC_CONFIRMED") && l.contains("key='abc'")));
    }

    #[test]
    fn confirm_with_a_wrong_secret_is_rejected() {
        let mut htlc = funded(true);
        for secret in ["abd", "ABC", "", "abc "] {
            assert_eq!(
                htlc.confirm(&other(), secret.to_string(), T + 10).err(),
                Some(HtlcError::InvalidKey)
            );
        }
        assert_eq!(htlc.phase, Phase::Funded);
        assert_eq!(htlc.key, None);
    }

    #[test]
    fn only_other_party_confirms() {
        let mut htlc = funded(true);
        assert_eq!(
            htlc.confirm(&owner(), "abc".to_string(), T + 10).err(),
            Some(HtlcError::Unauthorized)
        );
        assert_eq!(
            htlc.confirm(&accounts(3), "abc".to_string(), T + 10).err(),
            Some(HtlcError::Unauthorized)
        );
    }

    #[test]
    fn confirm_at_the_deadline_succeeds() {
        let mut htlc = funded(false);
        assert!(htlc.confirm(&other(), "abc".to_string(), T + 600).is_ok());
    }

    #[test]
    fn confirm_one_second_after_the_deadline_fails() {
        let mut htlc = funded(false);
        assert_eq!(
            htlc.confirm(&other(), "abc".to_string(), T + 601).err(),
            Some(HtlcError::DeadlineExpired)
        );
        let mut htlc = funded(true);
        assert!(htlc
            .confirm(&other(), "abc".to_string(), T + 601 + ONE_DAY)
            .is_err());
    }

    #[test]
    fn double_confirmation_is_impossible() {
        let mut htlc = funded(true);
        htlc.confirm(&other(), "abc".to_string(), T + 10).unwrap();
        assert_eq!(
            htlc.confirm(&other(), "abc".to_string(), T + 10).err(),
            Some(HtlcError::NotFunded)
        );
        htlc.resolve_pending(true);
        assert_eq!(
            htlc.confirm(&other(), "abc".to_string(), T + 10).err(),
            Some(HtlcError::NotFunded)
        );
    }

    #[test]
    fn failed_release_rolls_the_reveal_back() {
        let mut htlc = funded(true);
        htlc.confirm(&other(), "abc".to_string(), T + 10).unwrap();
        assert_eq!(htlc.resolve_pending(false), Phase::Funded);
        assert_eq!(htlc.key, None);
        assert_eq!(htlc.commitment.clone().unwrap().hash_key, hash_of("abc"));
        assert!(get_logs().iter().any(|l| {
            l.starts_with("HTLC_SETTLEMENT_FAILED") && l.contains(&format!("actor='{}'", other()))
        }));

        // The swap is usable again.
        assert!(htlc.confirm(&other(), "abc".to_string(), T + 20).is_ok());
    }

    #[test]
    fn reclaim_at_the_deadline_fails_and_after_succeeds() {
        let mut htlc = funded(false);
        assert_eq!(
            htlc.reclaim(&owner(), T + 600).err(),
            Some(HtlcError::NotYetExpired)
        );
        assert!(htlc.reclaim(&owner(), T + 601).is_ok());
        assert_eq!(htlc.phase, Phase::Settling);
        assert_eq!(htlc.resolve_pending(true), Phase::Reclaimed);
        assert_eq!(htlc.commitment, None);
        assert!(get_logs().iter().any(|l| l.starts_with("HTLC_RECLAIMED")));
    }

    #[test]
    fn initiator_reclaim_waits_for_the_extra_day() {
        let mut htlc = funded(true);
        assert_eq!(
            htlc.reclaim(&owner(), T + 601).err(),
            Some(HtlcError::NotYetExpired)
        );
        assert!(htlc.reclaim(&owner(), T + 601 + ONE_DAY).is_ok());
    }

    #[test]
    fn only_owner_reclaims() {
        let mut htlc = funded(false);
        assert_eq!(
            htlc.reclaim(&other(), T + 601).err(),
            Some(HtlcError::Unauthorized)
        );
    }

    #[test]
    fn reclaim_requires_a_funded_swap() {
        let mut htlc = htlc(true);
        assert_eq!(
            htlc.reclaim(&owner(), T + 601).err(),
            Some(HtlcError::NotFunded)
        );
    }

    #[test]
    fn failed_reclaim_keeps_the_swap_funded() {
        let mut htlc = funded(false);
        htlc.reclaim(&owner(), T + 601).unwrap();
        assert_eq!(htlc.resolve_pending(false), Phase::Funded);
        assert_eq!(htlc.commitment.clone().unwrap().deadline, T + 600);
        assert!(get_logs().iter().any(|l| {
            l.starts_with("HTLC_SETTLEMENT_FAILED") && l.contains(&format!("actor='{}'", owner()))
        }));
        assert!(htlc.reclaim(&owner(), T + 602).is_ok());
    }

    #[test]
    fn reclaimed_swap_can_be_funded_again() {
        let mut htlc = funded(false);
        htlc.reclaim(&owner(), T + 601).unwrap();
        htlc.resolve_pending(true);

        htlc.fund(&owner(), hash_of("second"), T + 2_000, false, T + 700)
            .unwrap();
        assert_eq!(htlc.phase, Phase::Funded);
        assert_eq!(htlc.key, None);
        assert_eq!(htlc.commitment.unwrap().hash_key, hash_of("second"));
    }

    #[test]
    fn failed_second_deposit_leaves_the_swap_reclaimed() {
        let mut htlc = funded(false);
        htlc.reclaim(&owner(), T + 601).unwrap();
        htlc.resolve_pending(true);

        htlc.asset.attached = false;
        let _ = htlc
            .fund(&owner(), hash_of("second"), T + 2_000, false, T + 700)
            .unwrap();
        assert_eq!(htlc.resolve_pending(false), Phase::Reclaimed);
    }

    #[test]
    fn confirmed_swap_is_final() {
        let mut htlc = funded(false);
        htlc.confirm(&other(), "abc".to_string(), T + 10).unwrap();
        htlc.resolve_pending(true);
        assert_eq!(
            htlc.fund(&owner(), hash_of("again"), T + 900, false, T + 20).err(),
            Some(HtlcError::NotFundable)
        );
        assert_eq!(
            htlc.reclaim(&owner(), T + 10_000).err(),
            Some(HtlcError::NotFunded)
        );
    }

    #[test]
    fn resolve_without_pending_transition_is_a_no_op() {
        let mut htlc = funded(false);
        assert_eq!(htlc.resolve_pending(false), Phase::Funded);
        assert!(htlc.commitment.is_some());
    }

    #[test]
    fn ownership_moves_only_while_nothing_is_escrowed() {
        let mut htlc = htlc(true);
        assert_eq!(
            htlc.transfer_ownership(&other(), accounts(3)),
            Err(HtlcError::Unauthorized)
        );
        assert_eq!(
            htlc.transfer_ownership(&owner(), other()),
            Err(HtlcError::InvalidParties)
        );
        htlc.transfer_ownership(&owner(), accounts(3)).unwrap();
        assert_eq!(htlc.parties.owner, accounts(3));

        htlc.fund(&accounts(3), hash_of("abc"), T + 600, false, T)
            .unwrap();
        assert_eq!(
            htlc.transfer_ownership(&accounts(3), accounts(4)),
            Err(HtlcError::OwnershipLocked)
        );
    }

    #[test]
    fn view_exposes_the_commitment() {
        let htlc = funded(true);
        let view = htlc.view();
        assert_eq!(view.owner, owner());
        assert_eq!(view.other_party, other());
        assert_eq!(view.phase, Phase::Funded);
        assert_eq!(view.hash_key, Some(hash_of("abc").into()));
        assert_eq!(view.deadline, Some(T + 600 + ONE_DAY));
        assert_eq!(view.key, None);

        let json = serde_json::to_value(&SwapView {
            asset: 7u64,
            owner: view.owner,
            other_party: view.other_party,
            phase: view.phase,
            hash_key: view.hash_key,
            deadline: view.deadline,
            key: view.key,
        })
        .unwrap();
        assert_eq!(json["phase"], "Funded");
        assert_eq!(json["deadline"], T + 600 + ONE_DAY);
    }
}
