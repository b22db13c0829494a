//! Optimistic mutation tracking over a caller-owned working set.
//!
//! Every mutation is applied locally as soon as it is issued and later either
//! committed with the collaborator's authoritative record or rolled back. The
//! coordinator keeps a log of unsettled mutations, each holding the full list
//! as it looked right before the mutation, so a rollback restores that list
//! and replays every later mutation in issuance order.

use std::collections::VecDeque;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::Clock;
use crate::domain::common::Identifiable;
use crate::domain::transaction::{Transaction, TransactionDraft, TransactionPatch};
use crate::errors::{EngineError, EngineResult};

pub type MutationId = u64;

/// Prefix of the temporary ids given to locally added transactions.
pub const PLACEHOLDER_PREFIX: &str = "pending-";

/// Number of settled mutations whose final state stays queryable.
pub const SETTLED_HISTORY: usize = 256;

/// The transaction list derived views are computed from.
///
/// `version` changes on every mutation transition; anything cached against an
/// older version is stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkingSet {
    transactions: Vec<Transaction>,
    version: u64,
}

impl WorkingSet {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            version: 0,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id() == id)
    }

    /// Replaces the whole list, e.g. after a fresh load from storage.
    pub fn reset(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
        self.bump();
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum MutationRequest {
    Add(TransactionDraft),
    Update { id: String, patch: TransactionPatch },
    Delete { id: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

/// What the collaborator answered for a successful mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum MutationOutcome {
    /// Authoritative record after an add or update.
    Saved(Transaction),
    /// Success without a record body, as for deletes.
    Acknowledged,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// Storage collaborator that persists transactions.
pub trait TransactionGateway: Send + Sync {
    fn create(&self, draft: &TransactionDraft) -> Result<Transaction, GatewayError>;
    fn update(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction, GatewayError>;
    fn delete(&self, id: &str) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone)]
enum Effect {
    Insert(Transaction),
    Patch(TransactionPatch),
    Replace(Transaction),
    Remove,
}

#[derive(Debug, Clone)]
struct LogEntry {
    id: MutationId,
    /// Id of the transaction the effect applies to.
    target: String,
    effect: Effect,
    state: MutationState,
    deadline: NaiveDateTime,
    /// Full list as it was right before this entry was applied.
    snapshot: Vec<Transaction>,
}

impl LogEntry {
    fn apply(&self, transactions: &mut Vec<Transaction>) {
        match &self.effect {
            Effect::Insert(txn) => transactions.push(txn.clone()),
            Effect::Remove => transactions.retain(|txn| txn.id != self.target),
            Effect::Patch(patch) => match self.find_target(transactions) {
                Some(txn) => txn.apply_patch(patch),
                None => self.warn_missing_target(),
            },
            Effect::Replace(record) => match self.find_target(transactions) {
                Some(txn) => *txn = record.clone(),
                None => self.warn_missing_target(),
            },
        }
    }

    fn find_target<'a>(&self, transactions: &'a mut [Transaction]) -> Option<&'a mut Transaction> {
        transactions.iter_mut().find(|txn| txn.id == self.target)
    }

    fn warn_missing_target(&self) {
        tracing::warn!(
            mutation = self.id,
            target = %self.target,
            "replayed update has no target"
        );
    }
}

#[derive(Debug, Default)]
pub struct MutationCoordinator {
    next_id: MutationId,
    log: VecDeque<LogEntry>,
    /// Most recently settled mutations, oldest first, capped at [`SETTLED_HISTORY`].
    settled: VecDeque<(MutationId, MutationState)>,
}

impl MutationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a mutation that is still pending or among the last
    /// [`SETTLED_HISTORY`] settled ones; older mutations report `None`.
    pub fn state(&self, id: MutationId) -> Option<MutationState> {
        self.log
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.state)
            .or_else(|| {
                self.settled
                    .iter()
                    .rev()
                    .find(|(settled, _)| *settled == id)
                    .map(|(_, state)| *state)
            })
    }

    pub fn pending_count(&self) -> usize {
        self.log
            .iter()
            .filter(|entry| entry.state == MutationState::Pending)
            .count()
    }

    /// Applies `request` to `set` optimistically and records it as pending.
    pub fn issue(
        &mut self,
        set: &mut WorkingSet,
        request: MutationRequest,
        deadline: NaiveDateTime,
    ) -> EngineResult<MutationId> {
        let (target, effect) = match request {
            MutationRequest::Add(draft) => {
                let placeholder = format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4());
                let txn = draft.into_transaction(placeholder.clone());
                (placeholder, Effect::Insert(txn))
            }
            MutationRequest::Update { id, patch } => {
                ensure_present(set, &id)?;
                (id, Effect::Patch(patch))
            }
            MutationRequest::Delete { id } => {
                ensure_present(set, &id)?;
                (id, Effect::Remove)
            }
        };

        self.next_id += 1;
        let entry = LogEntry {
            id: self.next_id,
            target,
            effect,
            state: MutationState::Pending,
            deadline,
            snapshot: set.transactions.clone(),
        };
        entry.apply(&mut set.transactions);
        set.bump();

        tracing::debug!(mutation = entry.id, target = %entry.target, "issued mutation");
        let id = entry.id;
        self.log.push_back(entry);
        Ok(id)
    }

    /// Settles a pending mutation with the collaborator's answer.
    ///
    /// An add is rewritten to the authoritative record and every later mutation
    /// aimed at its placeholder id is retargeted to the real id.
    pub fn commit(
        &mut self,
        set: &mut WorkingSet,
        id: MutationId,
        outcome: MutationOutcome,
    ) -> EngineResult<()> {
        let index = self.pending_index(id)?;

        let adds = matches!(self.log[index].effect, Effect::Insert(_));
        let placeholder = match outcome {
            MutationOutcome::Saved(record) if adds => {
                let placeholder =
                    std::mem::replace(&mut self.log[index].target, record.id.clone());
                self.log[index].effect = Effect::Insert(record);
                Some(placeholder)
            }
            MutationOutcome::Acknowledged if adds => {
                return Err(self.fail(set, id, "collaborator returned no record for an add"));
            }
            MutationOutcome::Saved(record) => {
                if matches!(self.log[index].effect, Effect::Patch(_)) {
                    self.log[index].effect = Effect::Replace(record);
                }
                None
            }
            MutationOutcome::Acknowledged => None,
        };

        if let Some(placeholder) = placeholder {
            let real_id = self.log[index].target.clone();
            for entry in self.log.iter_mut().skip(index + 1) {
                if entry.target == placeholder {
                    entry.target = real_id.clone();
                }
            }
        }

        self.settle(index, MutationState::Committed);
        self.rebuild_from(set, index);
        self.prune();

        tracing::info!(mutation = id, "committed mutation");
        Ok(())
    }

    /// Rolls a pending mutation back and returns the error to surface to the caller.
    ///
    /// The list is restored to the mutation's snapshot and every later mutation,
    /// pending or committed, is replayed on top in issuance order.
    pub fn fail(
        &mut self,
        set: &mut WorkingSet,
        id: MutationId,
        reason: impl Into<String>,
    ) -> EngineError {
        let index = match self.pending_index(id) {
            Ok(index) => index,
            Err(err) => return err,
        };
        let reason = reason.into();

        self.settle(index, MutationState::RolledBack);
        self.rebuild_from(set, index);
        self.prune();

        tracing::warn!(mutation = id, reason = %reason, "rolled back mutation");
        EngineError::MutationFailed {
            mutation: id,
            reason,
        }
    }

    /// Rolls back every pending mutation whose deadline is before `now`.
    pub fn expire_overdue(
        &mut self,
        set: &mut WorkingSet,
        now: NaiveDateTime,
    ) -> Vec<MutationId> {
        let overdue: Vec<MutationId> = self
            .log
            .iter()
            .filter(|entry| entry.state == MutationState::Pending && entry.deadline < now)
            .map(|entry| entry.id)
            .collect();
        for id in &overdue {
            self.fail(set, *id, "timed out");
        }
        overdue
    }

    /// Issues `request`, forwards it to `gateway`, and settles it with the answer.
    ///
    /// Collaborator errors and answers arriving after `timeout` roll the mutation back.
    /// A timeout reaching past the last representable instant never expires.
    pub fn execute(
        &mut self,
        set: &mut WorkingSet,
        request: MutationRequest,
        gateway: &dyn TransactionGateway,
        clock: &dyn Clock,
        timeout: StdDuration,
    ) -> EngineResult<MutationOutcome> {
        let issued_at = clock.now_naive();
        let deadline = Duration::from_std(timeout)
            .ok()
            .and_then(|timeout| issued_at.checked_add_signed(timeout))
            .unwrap_or(NaiveDateTime::MAX);
        let mutation = self.issue(set, request.clone(), deadline)?;

        let answer = match &request {
            MutationRequest::Add(draft) => gateway.create(draft).map(MutationOutcome::Saved),
            MutationRequest::Update { id, patch } => {
                gateway.update(id, patch).map(MutationOutcome::Saved)
            }
            MutationRequest::Delete { id } => {
                gateway.delete(id).map(|_| MutationOutcome::Acknowledged)
            }
        };

        if clock.now_naive() > deadline {
            return Err(self.fail(set, mutation, "timed out"));
        }
        match answer {
            Ok(outcome) => {
                self.commit(set, mutation, outcome.clone())?;
                Ok(outcome)
            }
            Err(err) => Err(self.fail(set, mutation, err.to_string())),
        }
    }

    fn pending_index(&self, id: MutationId) -> EngineResult<usize> {
        self.log
            .iter()
            .position(|entry| entry.id == id && entry.state == MutationState::Pending)
            .ok_or(EngineError::UnknownMutation(id))
    }

    fn settle(&mut self, index: usize, state: MutationState) {
        let entry = &mut self.log[index];
        entry.state = state;
        if self.settled.len() == SETTLED_HISTORY {
            self.settled.pop_front();
        }
        self.settled.push_back((entry.id, state));
    }

    /// Recomputes the list from the snapshot at `index`, refreshing later snapshots.
    fn rebuild_from(&mut self, set: &mut WorkingSet, index: usize) {
        let mut transactions = self.log[index].snapshot.clone();
        for entry in self.log.iter_mut().skip(index) {
            entry.snapshot = transactions.clone();
            if entry.state != MutationState::RolledBack {
                entry.apply(&mut transactions);
            }
        }
        set.transactions = transactions;
        set.bump();
    }

    fn prune(&mut self) {
        while self
            .log
            .front()
            .is_some_and(|entry| entry.state != MutationState::Pending)
        {
            self.log.pop_front();
        }
    }
}

fn ensure_present(set: &WorkingSet, id: &str) -> EngineResult<()> {
    match set.get(id) {
        Some(_) => Ok(()),
        None => Err(EngineError::UnknownTransaction(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::domain::transaction::TransactionKind;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn deadline() -> NaiveDateTime {
        now() + Duration::seconds(10)
    }

    fn seeded() -> WorkingSet {
        WorkingSet::new(vec![
            Transaction::expense("t1", "Food", 20.0, "2025-03-01"),
            Transaction::expense("t2", "Rent", 800.0, "2025-03-02"),
        ])
    }

    fn draft(category: &str, amount: f64) -> TransactionDraft {
        TransactionDraft {
            description: format!("{category} purchase"),
            category: category.into(),
            amount,
            date: "2025-03-10".into(),
            kind: TransactionKind::Expense,
        }
    }

    fn ids(set: &WorkingSet) -> Vec<&str> {
        set.transactions().iter().map(|txn| txn.id.as_str()).collect()
    }

    #[test]
    fn failed_add_restores_exact_list() {
        let mut set = seeded();
        let before = set.transactions().to_vec();
        let mut coordinator = MutationCoordinator::new();

        let id = coordinator
            .issue(&mut set, MutationRequest::Add(draft("Fun", 50.0)), deadline())
            .unwrap();
        assert_eq!(set.transactions().len(), 3);
        assert!(set.transactions()[2].id.starts_with(PLACEHOLDER_PREFIX));

        let err = coordinator.fail(&mut set, id, "server down");
        assert!(matches!(err, EngineError::MutationFailed { mutation, .. } if mutation == id));
        assert_eq!(set.transactions(), before.as_slice());
        assert_eq!(coordinator.state(id), Some(MutationState::RolledBack));
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn every_transition_bumps_version() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();
        let v0 = set.version();
        let id = coordinator
            .issue(&mut set, MutationRequest::Delete { id: "t1".into() }, deadline())
            .unwrap();
        let v1 = set.version();
        coordinator.commit(&mut set, id, MutationOutcome::Acknowledged).unwrap();
        assert!(v1 > v0);
        assert!(set.version() > v1);
        assert_eq!(ids(&set), vec!["t2"]);
    }

    #[test]
    fn rollback_replays_later_mutations() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();

        let update = coordinator
            .issue(
                &mut set,
                MutationRequest::Update {
                    id: "t1".into(),
                    patch: TransactionPatch {
                        amount: Some(35.0),
                        ..Default::default()
                    },
                },
                deadline(),
            )
            .unwrap();
        let delete = coordinator
            .issue(&mut set, MutationRequest::Delete { id: "t2".into() }, deadline())
            .unwrap();
        let add = coordinator
            .issue(&mut set, MutationRequest::Add(draft("Fun", 5.0)), deadline())
            .unwrap();

        coordinator.commit(&mut set, delete, MutationOutcome::Acknowledged).unwrap();
        coordinator.fail(&mut set, update, "rejected");

        assert_eq!(set.get("t1").unwrap().amount, 20.0);
        assert!(set.get("t2").is_none());
        assert_eq!(set.transactions().len(), 2);
        assert_eq!(coordinator.state(add), Some(MutationState::Pending));

        coordinator.fail(&mut set, add, "rejected");
        assert_eq!(ids(&set), vec!["t1"]);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn commit_retargets_followups_on_placeholder() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();

        let add = coordinator
            .issue(&mut set, MutationRequest::Add(draft("Fun", 50.0)), deadline())
            .unwrap();
        let placeholder = set.transactions()[2].id.clone();
        let rename = coordinator
            .issue(
                &mut set,
                MutationRequest::Update {
                    id: placeholder.clone(),
                    patch: TransactionPatch {
                        description: Some("Concert".into()),
                        ..Default::default()
                    },
                },
                deadline(),
            )
            .unwrap();

        let saved = Transaction::new(
            "srv-9",
            "Fun purchase",
            "Fun",
            50.0,
            "2025-03-10",
            TransactionKind::Expense,
        );
        coordinator.commit(&mut set, add, MutationOutcome::Saved(saved)).unwrap();

        assert!(set.get(&placeholder).is_none());
        assert_eq!(set.get("srv-9").unwrap().description, "Concert");

        coordinator.fail(&mut set, rename, "rejected");
        assert_eq!(set.get("srv-9").unwrap().description, "Fun purchase");
    }

    #[test]
    fn unknown_targets_are_rejected_without_side_effects() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();
        let version = set.version();
        let err = coordinator
            .issue(&mut set, MutationRequest::Delete { id: "nope".into() }, deadline())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownTransaction(ref id) if id == "nope"));
        assert_eq!(set.version(), version);
        assert!(matches!(
            coordinator.commit(&mut set, 42, MutationOutcome::Acknowledged),
            Err(EngineError::UnknownMutation(42))
        ));
    }

    #[test]
    fn settled_mutations_cannot_settle_again() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();
        let id = coordinator
            .issue(&mut set, MutationRequest::Delete { id: "t1".into() }, deadline())
            .unwrap();
        coordinator.commit(&mut set, id, MutationOutcome::Acknowledged).unwrap();
        let err = coordinator.fail(&mut set, id, "late failure");
        assert!(matches!(err, EngineError::UnknownMutation(_)));
        assert_eq!(ids(&set), vec!["t2"]);
    }

    #[test]
    fn overdue_mutations_expire_as_failures() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();
        let early = coordinator
            .issue(&mut set, MutationRequest::Add(draft("Fun", 1.0)), now() + Duration::seconds(1))
            .unwrap();
        let late = coordinator
            .issue(&mut set, MutationRequest::Add(draft("Gym", 2.0)), now() + Duration::minutes(5))
            .unwrap();

        let expired = coordinator.expire_overdue(&mut set, now() + Duration::seconds(30));
        assert_eq!(expired, vec![early]);
        assert_eq!(coordinator.state(late), Some(MutationState::Pending));
        assert_eq!(set.transactions().len(), 3);
        assert_eq!(set.transactions()[2].category, "Gym");
    }

    struct StubGateway<'a> {
        fail: bool,
        clock: Option<&'a FixedClock>,
    }

    impl TransactionGateway for StubGateway<'_> {
        fn create(&self, draft: &TransactionDraft) -> Result<Transaction, GatewayError> {
            if let Some(clock) = self.clock {
                clock.advance(Duration::seconds(60));
            }
            if self.fail {
                return Err(GatewayError("insert refused".into()));
            }
            Ok(draft.clone().into_transaction("srv-1"))
        }

        fn update(&self, id: &str, _patch: &TransactionPatch) -> Result<Transaction, GatewayError> {
            Err(GatewayError(format!("cannot update {id}")))
        }

        fn delete(&self, _id: &str) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    #[test]
    fn execute_commits_successful_add() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();
        let clock = FixedClock::at(now());
        let gateway = StubGateway {
            fail: false,
            clock: None,
        };
        let outcome = coordinator
            .execute(
                &mut set,
                MutationRequest::Add(draft("Fun", 9.0)),
                &gateway,
                &clock,
                StdDuration::from_secs(10),
            )
            .unwrap();
        assert!(matches!(outcome, MutationOutcome::Saved(ref txn) if txn.id == "srv-1"));
        assert_eq!(ids(&set), vec!["t1", "t2", "srv-1"]);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn execute_rolls_back_on_error_or_timeout() {
        let mut set = seeded();
        let before = set.transactions().to_vec();
        let mut coordinator = MutationCoordinator::new();
        let clock = FixedClock::at(now());

        let refusing = StubGateway {
            fail: true,
            clock: None,
        };
        let err = coordinator
            .execute(
                &mut set,
                MutationRequest::Add(draft("Fun", 9.0)),
                &refusing,
                &clock,
                StdDuration::from_secs(10),
            )
            .unwrap_err();
        let refused = matches!(
            err,
            EngineError::MutationFailed { ref reason, .. } if reason == "insert refused"
        );
        assert!(refused, "unexpected error: {err:?}");
        assert_eq!(set.transactions(), before.as_slice());

        let slow = StubGateway {
            fail: false,
            clock: Some(&clock),
        };
        let err = coordinator
            .execute(
                &mut set,
                MutationRequest::Add(draft("Fun", 9.0)),
                &slow,
                &clock,
                StdDuration::from_secs(10),
            )
            .unwrap_err();
        assert!(
            matches!(err, EngineError::MutationFailed { ref reason, .. } if reason == "timed out"),
            "unexpected error: {err:?}"
        );
        assert_eq!(set.transactions(), before.as_slice());
    }

    #[test]
    fn execute_treats_unbounded_timeouts_as_no_deadline() {
        let clock = FixedClock::at(now());
        let gateway = StubGateway {
            fail: false,
            clock: None,
        };
        for timeout in [StdDuration::MAX, StdDuration::from_secs(u64::MAX / 2000)] {
            let mut set = seeded();
            let mut coordinator = MutationCoordinator::new();
            let outcome = coordinator
                .execute(
                    &mut set,
                    MutationRequest::Add(draft("Fun", 9.0)),
                    &gateway,
                    &clock,
                    timeout,
                )
                .expect("no deadline");
            assert!(matches!(outcome, MutationOutcome::Saved(ref txn) if txn.id == "srv-1"));
            assert_eq!(ids(&set), vec!["t1", "t2", "srv-1"]);
            assert!(coordinator.expire_overdue(&mut set, NaiveDateTime::MAX).is_empty());
        }
    }

    #[test]
    fn settled_history_keeps_only_recent_states() {
        let mut set = seeded();
        let mut coordinator = MutationCoordinator::new();
        let mut settled = Vec::new();
        for _ in 0..=SETTLED_HISTORY {
            let id = coordinator
                .issue(&mut set, MutationRequest::Add(draft("Fun", 1.0)), deadline())
                .unwrap();
            coordinator.fail(&mut set, id, "rejected");
            settled.push(id);
        }
        let pending = coordinator
            .issue(&mut set, MutationRequest::Delete { id: "t1".into() }, deadline())
            .unwrap();

        assert_eq!(coordinator.state(settled[0]), None);
        assert_eq!(coordinator.state(settled[1]), Some(MutationState::RolledBack));
        assert_eq!(
            coordinator.state(settled[SETTLED_HISTORY]),
            Some(MutationState::RolledBack)
        );
        assert_eq!(coordinator.state(pending), Some(MutationState::Pending));
        assert_eq!(set.transactions().len(), 1);
    }
}
