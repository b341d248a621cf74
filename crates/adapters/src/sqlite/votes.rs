//! Vote transactions over the `likednews` and `likedcomment` relations
//!
//! `pool.begin()` opens a deferred transaction, so the first statement of
//! every toggle is a no-op write on the target row. That takes the database
//! write lock up front: concurrent toggles queue on the busy handler instead
//! of failing when a reader tries to upgrade.
//!
//! SQLite has one writer per database, so toggles on different targets queue
//! on the same lock, and a toggle still waiting after `BUSY_TIMEOUT` fails
//! as a storage error. Only the in-memory store keeps targets independent.

use async_trait::async_trait;
use newsdesk_domain::{Stance, StoreError, UserId, VoteStore, VoteTarget, VoteTx};
use sqlx::{Sqlite, Transaction};

use super::{SqliteStore, db_err};

/// Table and column names for one vote relation and its target
struct VoteTable {
    votes: &'static str,
    target: &'static str,
    key: &'static str,
    counter: &'static str,
}

const NEWS_VOTES: VoteTable = VoteTable {
    votes: "likednews",
    target: "news",
    key: "newsid",
    counter: "likes",
};

const COMMENT_VOTES: VoteTable = VoteTable {
    votes: "likedcomment",
    target: "comment",
    key: "commentid",
    counter: "votes",
};

impl VoteTable {
    fn for_target(target: VoteTarget) -> &'static VoteTable {
        match target {
            VoteTarget::News => &NEWS_VOTES,
            VoteTarget::Comment => &COMMENT_VOTES,
        }
    }
}

struct SqliteVoteTx {
    tx: Transaction<'static, Sqlite>,
    table: &'static VoteTable,
}

#[async_trait]
impl VoteStore for SqliteStore {
    async fn begin(&self, target: VoteTarget) -> Result<Box<dyn VoteTx>, StoreError> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(SqliteVoteTx {
            tx,
            table: VoteTable::for_target(target),
        }))
    }
}

#[async_trait]
impl VoteTx for SqliteVoteTx {
    async fn lock_target(&mut self, target_id: i64) -> Result<Option<i64>, StoreError> {
        let t = self.table;
        let sql = format!(
            "UPDATE {} SET {c} = {c} WHERE {} = ? RETURNING {c}",
            t.target,
            t.key,
            c = t.counter
        );
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(target_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(row.map(|(counter,)| counter))
    }

    async fn find_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
    ) -> Result<Option<Stance>, StoreError> {
        let sql = format!(
            "SELECT like_status FROM {} WHERE uid = ? AND {} = ?",
            self.table.votes, self.table.key
        );
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(voter_id)
            .bind(target_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;

        row.map(|(status,)| {
            status
                .parse::<Stance>()
                .map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn insert_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
        stance: Stance,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (uid, {}, like_status) VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
            self.table.votes, self.table.key
        );
        let result = sqlx::query(&sql)
            .bind(voter_id)
            .bind(target_id)
            .bind(stance.as_label())
            .execute(&mut *self.tx)
            .await
            // The target row is already locked, so a broken reference is the voter.
            .map_err(|e| match db_err(e) {
                StoreError::NotFound(_) => StoreError::NotFound(format!("user {}", voter_id)),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "user {} already voted on {} {}",
                voter_id, self.table.target, target_id
            )));
        }
        Ok(())
    }

    async fn update_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
        stance: Stance,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET like_status = ? WHERE uid = ? AND {} = ?",
            self.table.votes, self.table.key
        );
        let result = sqlx::query(&sql)
            .bind(stance.as_label())
            .bind(voter_id)
            .bind(target_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "vote of user {} on {} {}",
                voter_id, self.table.target, target_id
            )));
        }
        Ok(())
    }

    async fn delete_vote(&mut self, voter_id: UserId, target_id: i64) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE uid = ? AND {} = ?",
            self.table.votes, self.table.key
        );
        let result = sqlx::query(&sql)
            .bind(voter_id)
            .bind(target_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "vote of user {} on {} {}",
                voter_id, self.table.target, target_id
            )));
        }
        Ok(())
    }

    async fn adjust_counter(&mut self, target_id: i64, delta: i64) -> Result<i64, StoreError> {
        let t = self.table;
        let sql = format!(
            "UPDATE {} SET {c} = {c} + ? WHERE {} = ? RETURNING {c}",
            t.target,
            t.key,
            c = t.counter
        );
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(delta)
            .bind(target_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;

        row.map(|(counter,)| counter)
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", t.target, target_id)))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::fixtures::{T0, article, comment, user};
    use newsdesk_domain::usecases::{VoteEngine, VoteError};
    use newsdesk_domain::{NewsStore, VoteTransition};
    use std::sync::Arc;

    async fn counter(store: &SqliteStore, target: VoteTarget, id: i64) -> i64 {
        let mut tx = store.begin(target).await.unwrap();
        tx.lock_target(id).await.unwrap().unwrap()
    }

    async fn stance(store: &SqliteStore, target: VoteTarget, voter: UserId, id: i64) -> Option<Stance> {
        let mut tx = store.begin(target).await.unwrap();
        tx.find_vote(voter, id).await.unwrap()
    }

    #[tokio::test]
    async fn test_news_toggle_sequence() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let author = user(&store, "author").await;
        let voter = user(&store, "voter").await;
        let news = article(&store, author, "rates", "economy", T0).await;

        // Seed the counter at 5 without a record for this voter.
        let mut tx = store.begin(VoteTarget::News).await.unwrap();
        tx.lock_target(news).await.unwrap();
        tx.adjust_counter(news, 5).await.unwrap();
        tx.commit().await.unwrap();

        let engine = VoteEngine::new(Arc::clone(&store));

        let up = engine.toggle(VoteTarget::News, voter, news, Stance::Up).await.unwrap();
        assert_eq!(up.counter, 6);
        assert_eq!(stance(&store, VoteTarget::News, voter, news).await, Some(Stance::Up));

        let down = engine.toggle(VoteTarget::News, voter, news, Stance::Down).await.unwrap();
        assert_eq!(down.counter, 4);
        assert_eq!(
            down.transition,
            VoteTransition::Flipped {
                from: Stance::Up,
                to: Stance::Down
            }
        );

        let cleared = engine.toggle(VoteTarget::News, voter, news, Stance::Down).await.unwrap();
        assert_eq!(cleared.counter, 5);
        assert_eq!(cleared.stance, None);
        assert_eq!(stance(&store, VoteTarget::News, voter, news).await, None);

        let stored = store.news_detail(news).await.unwrap().unwrap();
        assert_eq!(stored.likes, 5);
    }

    #[tokio::test]
    async fn test_comment_votes_use_comment_counter() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let author = user(&store, "author").await;
        let news = article(&store, author, "rates", "economy", T0).await;
        let c = comment(&store, author, news, "first").await;

        let engine = VoteEngine::new(Arc::clone(&store));
        let outcome = engine
            .toggle_requested(VoteTarget::Comment, author, c, "Dislike")
            .await
            .unwrap();

        assert_eq!(outcome.counter, -1);
        assert_eq!(counter(&store, VoteTarget::Comment, c).await, -1);
        assert_eq!(counter(&store, VoteTarget::News, news).await, 0);
    }

    #[tokio::test]
    async fn test_missing_target_and_missing_voter() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let author = user(&store, "author").await;
        let news = article(&store, author, "rates", "economy", T0).await;
        let engine = VoteEngine::new(Arc::clone(&store));

        let err = engine
            .toggle(VoteTarget::News, author, 999, Stance::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::NotFound(_)));

        let err = engine
            .toggle(VoteTarget::News, 777, news, Stance::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::NotFound(ref what) if what == "user 777"));
        assert_eq!(err.http_status(), 404);
        assert_eq!(counter(&store, VoteTarget::News, news).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = SqliteStore::in_memory().await.unwrap();
        let author = user(&store, "author").await;
        let news = article(&store, author, "rates", "economy", T0).await;

        {
            let mut tx = store.begin(VoteTarget::News).await.unwrap();
            tx.lock_target(news).await.unwrap();
            tx.insert_vote(author, news, Stance::Up).await.unwrap();
            tx.adjust_counter(news, 1).await.unwrap();
        }

        assert_eq!(counter(&store, VoteTarget::News, news).await, 0);
        assert_eq!(stance(&store, VoteTarget::News, author, news).await, None);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let store = SqliteStore::in_memory().await.unwrap();
        let author = user(&store, "author").await;
        let news = article(&store, author, "rates", "economy", T0).await;

        let mut tx = store.begin(VoteTarget::News).await.unwrap();
        tx.insert_vote(author, news, Stance::Up).await.unwrap();
        let err = tx.insert_vote(author, news, Stance::Down).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_first_votes_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("votes.db")).await.unwrap());
        let author = user(&store, "author").await;
        let news = article(&store, author, "rates", "economy", T0).await;

        let mut voters = Vec::new();
        for i in 0..20 {
            voters.push(user(&store, &format!("voter{}", i)).await);
        }

        let engine = VoteEngine::new(Arc::clone(&store));
        let handles: Vec<_> = voters
            .iter()
            .map(|&voter| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.toggle(VoteTarget::News, voter, news, Stance::Up).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(counter(&store, VoteTarget::News, news).await, 20);
    }
}
