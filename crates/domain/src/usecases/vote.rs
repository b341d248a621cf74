//! Like/dislike toggling shared by news articles and comments

use std::sync::Arc;
use thiserror::Error;

use crate::{
    model::{InvalidStance, Stance, UserId, VoteOutcome, VoteTarget, VoteTransition},
    ports::{StoreError, VoteStore},
};

/// Errors from toggling a vote
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Invalid stance: {0}")]
    InvalidStance(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Persistence error: {0}")]
    Persistence(#[source] StoreError),
}

impl VoteError {
    /// Status code an HTTP caller should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            VoteError::InvalidStance(_) => 400,
            VoteError::NotFound(_) => 404,
            VoteError::Persistence(_) => 500,
        }
    }
}

impl From<InvalidStance> for VoteError {
    fn from(err: InvalidStance) -> Self {
        VoteError::InvalidStance(err.0)
    }
}

impl From<StoreError> for VoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => VoteError::NotFound(what),
            other => VoteError::Persistence(other),
        }
    }
}

/// Applies the three-state vote toggle to any target kind
///
/// Every call runs in its own store transaction: the target row is locked,
/// the voter's record is read and rewritten, and the counter is adjusted
/// before a single commit. Any failure drops the transaction, leaving both
/// the record and the counter untouched.
pub struct VoteEngine<S: VoteStore + ?Sized> {
    store: Arc<S>,
}

impl<S: VoteStore + ?Sized> Clone for VoteEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: VoteStore + ?Sized> VoteEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Toggle the voter's stance on a target
    pub async fn toggle(
        &self,
        target: VoteTarget,
        voter_id: UserId,
        target_id: i64,
        requested: Stance,
    ) -> Result<VoteOutcome, VoteError> {
        let mut tx = self.store.begin(target).await?;

        if tx.lock_target(target_id).await?.is_none() {
            return Err(VoteError::NotFound(format!("{} {}", target, target_id)));
        }

        let existing = tx.find_vote(voter_id, target_id).await?;
        let transition = VoteTransition::resolve(existing, requested);

        match transition {
            VoteTransition::Cast { stance } => {
                tx.insert_vote(voter_id, target_id, stance).await?;
            }
            VoteTransition::Cleared { .. } => {
                tx.delete_vote(voter_id, target_id).await?;
            }
            VoteTransition::Flipped { to, .. } => {
                tx.update_vote(voter_id, target_id, to).await?;
            }
        }

        let counter = tx
            .adjust_counter(target_id, transition.counter_delta())
            .await?;
        tx.commit().await?;

        tracing::info!(
            target_kind = %target,
            target_id,
            voter_id,
            transition = ?transition,
            counter,
            "Toggled vote"
        );

        Ok(VoteOutcome {
            target,
            target_id,
            voter_id,
            transition,
            stance: transition.resulting_stance(),
            counter,
        })
    }

    /// Toggle with a stance given as text (`Like`/`Dislike`, `up`/`down`)
    pub async fn toggle_requested(
        &self,
        target: VoteTarget,
        voter_id: UserId,
        target_id: i64,
        requested: &str,
    ) -> Result<VoteOutcome, VoteError> {
        let stance: Stance = requested.parse()?;
        self.toggle(target, voter_id, target_id, stance).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::VoteTx;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Mutex, OwnedMutexGuard};

    #[derive(Debug, Clone, Default)]
    struct FakeTables {
        counters: HashMap<i64, i64>,
        votes: HashMap<(UserId, i64), Stance>,
    }

    /// Store that serializes transactions behind one lock and only publishes
    /// the working copy on commit
    struct FakeVoteStore {
        tables: Arc<Mutex<FakeTables>>,
        fail_on_adjust: bool,
        commits: Arc<AtomicUsize>,
    }

    impl FakeVoteStore {
        fn with_target(target_id: i64, counter: i64) -> Self {
            let mut tables = FakeTables::default();
            tables.counters.insert(target_id, counter);
            Self {
                tables: Arc::new(Mutex::new(tables)),
                fail_on_adjust: false,
                commits: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing_on_adjust(mut self) -> Self {
            self.fail_on_adjust = true;
            self
        }

        async fn counter(&self, target_id: i64) -> i64 {
            self.tables.lock().await.counters[&target_id]
        }

        async fn vote(&self, voter: UserId, target_id: i64) -> Option<Stance> {
            self.tables.lock().await.votes.get(&(voter, target_id)).copied()
        }

        async fn seed_vote(&self, voter: UserId, target_id: i64, stance: Stance) {
            self.tables
                .lock()
                .await
                .votes
                .insert((voter, target_id), stance);
        }
    }

    struct FakeTx {
        guard: OwnedMutexGuard<FakeTables>,
        working: FakeTables,
        fail_on_adjust: bool,
        commits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VoteStore for FakeVoteStore {
        async fn begin(&self, _target: VoteTarget) -> Result<Box<dyn VoteTx>, StoreError> {
            let guard = Arc::clone(&self.tables).lock_owned().await;
            let working = guard.clone();
            Ok(Box::new(FakeTx {
                guard,
                working,
                fail_on_adjust: self.fail_on_adjust,
                commits: Arc::clone(&self.commits),
            }))
        }
    }

    #[async_trait]
    impl VoteTx for FakeTx {
        async fn lock_target(&mut self, target_id: i64) -> Result<Option<i64>, StoreError> {
            Ok(self.working.counters.get(&target_id).copied())
        }

        async fn find_vote(
            &mut self,
            voter_id: UserId,
            target_id: i64,
        ) -> Result<Option<Stance>, StoreError> {
            Ok(self.working.votes.get(&(voter_id, target_id)).copied())
        }

        async fn insert_vote(
            &mut self,
            voter_id: UserId,
            target_id: i64,
            stance: Stance,
        ) -> Result<(), StoreError> {
            self.working.votes.insert((voter_id, target_id), stance);
            Ok(())
        }

        async fn update_vote(
            &mut self,
            voter_id: UserId,
            target_id: i64,
            stance: Stance,
        ) -> Result<(), StoreError> {
            self.working.votes.insert((voter_id, target_id), stance);
            Ok(())
        }

        async fn delete_vote(&mut self, voter_id: UserId, target_id: i64) -> Result<(), StoreError> {
            self.working.votes.remove(&(voter_id, target_id));
            Ok(())
        }

        async fn adjust_counter(&mut self, target_id: i64, delta: i64) -> Result<i64, StoreError> {
            if self.fail_on_adjust {
                return Err(StoreError::Database("disk I/O error".to_string()));
            }
            let counter = self
                .working
                .counters
                .get_mut(&target_id)
                .ok_or_else(|| StoreError::NotFound(format!("target {}", target_id)))?;
            *counter += delta;
            Ok(*counter)
        }

        async fn commit(self: Box<Self>) -> Result<(), StoreError> {
            let FakeTx {
                mut guard,
                working,
                commits,
                ..
            } = *self;
            *guard = working;
            commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const VOTER: UserId = 7;
    const TARGET: i64 = 42;

    fn engine(store: &Arc<FakeVoteStore>) -> VoteEngine<FakeVoteStore> {
        VoteEngine::new(Arc::clone(store))
    }

    #[test]
    fn test_transition_table() {
        use Stance::{Down, Up};

        let cases = [
            (None, Up, Some(Up), 1),
            (None, Down, Some(Down), -1),
            (Some(Up), Up, None, -1),
            (Some(Down), Down, None, 1),
            (Some(Up), Down, Some(Down), -2),
            (Some(Down), Up, Some(Up), 2),
        ];

        for (existing, requested, resulting, delta) in cases {
            let transition = VoteTransition::resolve(existing, requested);
            assert_eq!(
                transition.resulting_stance(),
                resulting,
                "{:?} + {:?}",
                existing,
                requested
            );
            assert_eq!(
                transition.counter_delta(),
                delta,
                "{:?} + {:?}",
                existing,
                requested
            );
        }
    }

    #[tokio::test]
    async fn test_each_transition_against_store() {
        use Stance::{Down, Up};

        let cases = [
            (None, Up, Some(Up), 1),
            (None, Down, Some(Down), -1),
            (Some(Up), Up, None, -1),
            (Some(Down), Down, None, 1),
            (Some(Up), Down, Some(Down), -2),
            (Some(Down), Up, Some(Up), 2),
        ];

        for (existing, requested, resulting, delta) in cases {
            let store = Arc::new(FakeVoteStore::with_target(TARGET, 10));
            if let Some(stance) = existing {
                store.seed_vote(VOTER, TARGET, stance).await;
            }

            let outcome = engine(&store)
                .toggle(VoteTarget::Comment, VOTER, TARGET, requested)
                .await
                .unwrap();

            assert_eq!(outcome.stance, resulting);
            assert_eq!(outcome.counter, 10 + delta);
            assert_eq!(store.vote(VOTER, TARGET).await, resulting);
            assert_eq!(store.counter(TARGET).await, 10 + delta);
        }
    }

    #[tokio::test]
    async fn test_like_flip_and_clear_sequence() {
        let store = Arc::new(FakeVoteStore::with_target(TARGET, 5));
        let engine = engine(&store);

        let outcome = engine
            .toggle(VoteTarget::News, VOTER, TARGET, Stance::Up)
            .await
            .unwrap();
        assert_eq!(outcome.counter, 6);
        assert_eq!(store.vote(VOTER, TARGET).await, Some(Stance::Up));

        let outcome = engine
            .toggle(VoteTarget::News, VOTER, TARGET, Stance::Down)
            .await
            .unwrap();
        assert_eq!(outcome.counter, 4);
        assert_eq!(
            outcome.transition,
            VoteTransition::Flipped {
                from: Stance::Up,
                to: Stance::Down
            }
        );
        assert_eq!(store.vote(VOTER, TARGET).await, Some(Stance::Down));

        let outcome = engine
            .toggle(VoteTarget::News, VOTER, TARGET, Stance::Down)
            .await
            .unwrap();
        assert_eq!(outcome.counter, 5);
        assert_eq!(outcome.stance, None);
        assert_eq!(store.vote(VOTER, TARGET).await, None);
    }

    #[tokio::test]
    async fn test_double_like_restores_counter() {
        let store = Arc::new(FakeVoteStore::with_target(TARGET, 0));
        let engine = engine(&store);

        engine
            .toggle(VoteTarget::News, VOTER, TARGET, Stance::Up)
            .await
            .unwrap();
        engine
            .toggle(VoteTarget::News, VOTER, TARGET, Stance::Up)
            .await
            .unwrap();

        assert_eq!(store.counter(TARGET).await, 0);
        assert_eq!(store.vote(VOTER, TARGET).await, None);
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let store = Arc::new(FakeVoteStore::with_target(TARGET, 0));

        let err = engine(&store)
            .toggle(VoteTarget::Comment, VOTER, 999, Stance::Up)
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::NotFound(_)));
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn test_invalid_stance_is_rejected_before_touching_store() {
        let store = Arc::new(FakeVoteStore::with_target(TARGET, 3));

        let err = engine(&store)
            .toggle_requested(VoteTarget::News, VOTER, TARGET, "Meh")
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::InvalidStance(ref s) if s == "Meh"));
        assert_eq!(err.http_status(), 400);
        assert_eq!(store.counter(TARGET).await, 3);
    }

    #[tokio::test]
    async fn test_requested_labels_parse() {
        let store = Arc::new(FakeVoteStore::with_target(TARGET, 0));
        let engine = engine(&store);

        let outcome = engine
            .toggle_requested(VoteTarget::News, VOTER, TARGET, "Dislike")
            .await
            .unwrap();
        assert_eq!(outcome.stance, Some(Stance::Down));
        assert_eq!(outcome.counter, -1);
    }

    #[tokio::test]
    async fn test_failed_counter_update_leaves_no_partial_effect() {
        let store = Arc::new(FakeVoteStore::with_target(TARGET, 5).failing_on_adjust());

        let err = engine(&store)
            .toggle(VoteTarget::News, VOTER, TARGET, Stance::Up)
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::Persistence(_)));
        assert_eq!(err.http_status(), 500);
        assert_eq!(store.vote(VOTER, TARGET).await, None);
        assert_eq!(store.counter(TARGET).await, 5);
        assert_eq!(store.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_votes_are_all_counted() {
        let store = Arc::new(FakeVoteStore::with_target(TARGET, 0));
        let engine = engine(&store);

        let voters: Vec<UserId> = (1..=25).collect();
        let results = futures::future::join_all(voters.iter().map(|voter| {
            let engine = engine.clone();
            let voter = *voter;
            async move {
                engine
                    .toggle(VoteTarget::Comment, voter, TARGET, Stance::Up)
                    .await
            }
        }))
        .await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(store.counter(TARGET).await, 25);
    }

    fn arb_stance() -> impl Strategy<Value = Stance> {
        prop_oneof![Just(Stance::Up), Just(Stance::Down)]
    }

    proptest! {
        /// Property: the counter always equals its start value plus the net
        /// change of the voter's record.
        #[test]
        fn counter_tracks_net_vote(
            initial_counter in -1000i64..1000,
            initial in proptest::option::of(arb_stance()),
            presses in proptest::collection::vec(arb_stance(), 0..40),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = Arc::new(FakeVoteStore::with_target(TARGET, initial_counter));
                if let Some(stance) = initial {
                    store.seed_vote(VOTER, TARGET, stance).await;
                }
                let engine = engine(&store);

                let mut expected_record = initial;
                for stance in presses {
                    let outcome = engine
                        .toggle(VoteTarget::Comment, VOTER, TARGET, stance)
                        .await
                        .unwrap();
                    expected_record = VoteTransition::resolve(expected_record, stance)
                        .resulting_stance();

                    let net = expected_record.map_or(0, Stance::sign)
                        - initial.map_or(0, Stance::sign);
                    prop_assert_eq!(outcome.counter, initial_counter + net);
                }

                prop_assert_eq!(store.vote(VOTER, TARGET).await, expected_record);
                Ok(())
            })?;
        }
    }
}
