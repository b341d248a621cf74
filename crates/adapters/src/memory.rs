//! In-memory store for testing and offline mode
//!
//! Vote transactions take a per-target async lock and buffer their writes
//! until commit, so toggles on different targets never wait on each other.
//! A target's lock entry is dropped once no transaction holds or awaits it.

use async_trait::async_trait;
use newsdesk_domain::{
    Account, AccountRecord, AccountStore, Comment, CommentId, CommentStore, NewComment,
    NewsArticle, NewsCard, NewsDetail, NewsId, NewsRecord, NewsStore, Stance, StoreError,
    StoredAccount, UserId, ViewerVote, VoteStore, VoteTarget, VoteTx,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use time::OffsetDateTime;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type TargetLocks = HashMap<(VoteTarget, i64), Arc<AsyncMutex<()>>>;

struct CommentRow {
    news_id: NewsId,
    author_id: UserId,
    body: String,
    votes: i64,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, StoredAccount>,
    news: BTreeMap<NewsId, NewsArticle>,
    comments: BTreeMap<CommentId, CommentRow>,
    saved: BTreeSet<(UserId, NewsId)>,
    votes: HashMap<(VoteTarget, UserId, i64), Stance>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn counter(&self, target: VoteTarget, id: i64) -> Option<i64> {
        match target {
            VoteTarget::News => self.news.get(&id).map(|n| n.likes),
            VoteTarget::Comment => self.comments.get(&id).map(|c| c.votes),
        }
    }

    fn counter_mut(&mut self, target: VoteTarget, id: i64) -> Option<&mut i64> {
        match target {
            VoteTarget::News => self.news.get_mut(&id).map(|n| &mut n.likes),
            VoteTarget::Comment => self.comments.get_mut(&id).map(|c| &mut c.votes),
        }
    }

    fn username(&self, id: UserId) -> String {
        self.users
            .get(&id)
            .map(|u| u.account.username.clone())
            .unwrap_or_default()
    }

    fn card(&self, article: &NewsArticle) -> NewsCard {
        NewsCard {
            id: article.id,
            title: article.title.clone(),
            category: article.category.clone(),
            banner_url: article.banner_url.clone(),
            summary: article.summary.clone(),
            author: self.username(article.created_by),
            likes: article.likes,
            created_at: article.created_at,
        }
    }

    /// Cards matching `keep`, newest first
    fn newest_cards(&self, keep: impl Fn(&NewsArticle) -> bool) -> Vec<NewsCard> {
        let mut articles: Vec<&NewsArticle> = self.news.values().filter(|a| keep(a)).collect();
        articles.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        articles.into_iter().map(|a| self.card(a)).collect()
    }

    fn comment(&self, id: CommentId, row: &CommentRow) -> Comment {
        let author = self.users.get(&row.author_id).map(|u| &u.account);
        Comment {
            id,
            news_id: row.news_id,
            author_id: row.author_id,
            author_name: author.map(|a| a.username.clone()).unwrap_or_default(),
            author_pic: author.and_then(|a| a.profile_pic.clone()),
            body: row.body.clone(),
            votes: row.votes,
            created_at: row.created_at,
        }
    }
}

/// In-memory implementation of every persistence port
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    target_locks: Arc<Mutex<TargetLocks>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_account(&self, record: &AccountRecord) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        if tables
            .users
            .values()
            .any(|u| u.account.email == record.email)
        {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                record.email
            )));
        }

        let account = Account {
            id: tables.allocate_id(),
            username: record.username.clone(),
            email: record.email.clone(),
            role: record.role,
            profile_pic: None,
            created_at: record.created_at,
        };
        tables.users.insert(
            account.id,
            StoredAccount {
                account: account.clone(),
                password_hash: record.password_hash.clone(),
            },
        );
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredAccount>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.account.email == email)
            .cloned())
    }

    async fn get_account(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.users.get(&id).map(|u| u.account.clone()))
    }

    async fn set_profile_pic(&self, id: UserId, url: &str) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.account.profile_pic = Some(url.to_string());
        Ok(user.account.clone())
    }
}

#[async_trait]
impl NewsStore for InMemoryStore {
    async fn create_news(&self, record: &NewsRecord) -> Result<NewsArticle, StoreError> {
        let mut tables = self.write()?;
        let draft = &record.draft;
        if !tables.users.contains_key(&draft.created_by) {
            return Err(StoreError::NotFound(format!("user {}", draft.created_by)));
        }

        let article = NewsArticle {
            id: tables.allocate_id(),
            created_by: draft.created_by,
            title: draft.title.clone(),
            category: draft.category.clone(),
            banner_url: record.banner_url.clone(),
            image_url: record.image_url.clone(),
            content: draft.content.clone(),
            summary: draft.summary.clone(),
            likes: 0,
            created_at: record.created_at,
        };
        tables.news.insert(article.id, article.clone());
        Ok(article)
    }

    async fn news_detail(&self, id: NewsId) -> Result<Option<NewsDetail>, StoreError> {
        let tables = self.read()?;
        Ok(tables.news.get(&id).map(|a| NewsDetail {
            id: a.id,
            category: a.category.clone(),
            title: a.title.clone(),
            author: tables.username(a.created_by),
            created_at: a.created_at,
            likes: a.likes,
            image_url: a.image_url.clone(),
            content: a.content.clone(),
        }))
    }

    async fn top_news(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<NewsCard>, StoreError> {
        let mut cards = self.read()?.newest_cards(|a| a.created_at >= since);
        // Stable sort keeps newest first among equal likes.
        cards.sort_by(|a, b| b.likes.cmp(&a.likes));
        cards.truncate(limit as usize);
        Ok(cards)
    }

    async fn latest_news(&self, limit: Option<u32>) -> Result<Vec<NewsCard>, StoreError> {
        let mut cards = self.read()?.newest_cards(|_| true);
        if let Some(limit) = limit {
            cards.truncate(limit as usize);
        }
        Ok(cards)
    }

    async fn latest_by_category(&self, per_category: u32) -> Result<Vec<NewsCard>, StoreError> {
        let mut cards = self.read()?.newest_cards(|_| true);
        cards.sort_by(|a, b| a.category.cmp(&b.category));

        let mut taken: HashMap<String, u32> = HashMap::new();
        cards.retain(|card| {
            let count = taken.entry(card.category.clone()).or_default();
            *count += 1;
            *count <= per_category
        });
        Ok(cards)
    }

    async fn news_by_author(&self, author: UserId) -> Result<Vec<NewsCard>, StoreError> {
        Ok(self.read()?.newest_cards(|a| a.created_by == author))
    }

    async fn save_news(&self, user: UserId, news: NewsId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user) || !tables.news.contains_key(&news) {
            return Err(StoreError::NotFound(format!(
                "user {} or news {}",
                user, news
            )));
        }
        if !tables.saved.insert((user, news)) {
            return Err(StoreError::Conflict(format!(
                "news {} already saved by user {}",
                news, user
            )));
        }
        Ok(())
    }

    async fn unsave_news(&self, user: UserId, news: NewsId) -> Result<bool, StoreError> {
        Ok(self.write()?.saved.remove(&(user, news)))
    }

    async fn saved_news(&self, user: UserId) -> Result<Vec<NewsCard>, StoreError> {
        let tables = self.read()?;
        Ok(tables.newest_cards(|a| tables.saved.contains(&(user, a.id))))
    }

    async fn delete_news(&self, id: NewsId) -> Result<Option<NewsArticle>, StoreError> {
        let mut tables = self.write()?;
        let Some(article) = tables.news.remove(&id) else {
            return Ok(None);
        };

        let orphaned: BTreeSet<CommentId> = tables
            .comments
            .iter()
            .filter(|(_, c)| c.news_id == id)
            .map(|(cid, _)| *cid)
            .collect();
        tables.comments.retain(|cid, _| !orphaned.contains(cid));
        tables.votes.retain(|(target, _, target_id), _| match target {
            VoteTarget::News => *target_id != id,
            VoteTarget::Comment => !orphaned.contains(target_id),
        });
        tables.saved.retain(|(_, news)| *news != id);

        Ok(Some(article))
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn create_comment(
        &self,
        comment: &NewComment,
        created_at: OffsetDateTime,
    ) -> Result<Comment, StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&comment.author_id)
            || !tables.news.contains_key(&comment.news_id)
        {
            return Err(StoreError::NotFound(format!(
                "user {} or news {}",
                comment.author_id, comment.news_id
            )));
        }

        let id = tables.allocate_id();
        let row = CommentRow {
            news_id: comment.news_id,
            author_id: comment.author_id,
            body: comment.body.clone(),
            votes: 0,
            created_at,
        };
        let created = tables.comment(id, &row);
        tables.comments.insert(id, row);
        Ok(created)
    }

    async fn comments_for_news(&self, news: NewsId) -> Result<Vec<Comment>, StoreError> {
        let tables = self.read()?;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|(_, c)| c.news_id == news)
            .map(|(id, c)| tables.comment(*id, c))
            .collect();
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(comments)
    }

    async fn viewer_votes(
        &self,
        news: NewsId,
        viewer: UserId,
    ) -> Result<Vec<ViewerVote>, StoreError> {
        let tables = self.read()?;
        let mut votes: Vec<ViewerVote> = tables
            .votes
            .iter()
            .filter(|((target, uid, cid), _)| {
                *target == VoteTarget::Comment
                    && *uid == viewer
                    && tables.comments.get(cid).is_some_and(|c| c.news_id == news)
            })
            .map(|((_, _, cid), stance)| ViewerVote {
                comment_id: *cid,
                stance: *stance,
            })
            .collect();
        votes.sort_by_key(|v| v.comment_id);
        Ok(votes)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.comments.remove(&id).is_none() {
            return Ok(false);
        }
        tables
            .votes
            .retain(|(target, _, target_id), _| !(*target == VoteTarget::Comment && *target_id == id));
        Ok(true)
    }
}

/// Buffered vote transaction holding the locks of the targets it touched
struct MemoryVoteTx {
    tables: Arc<RwLock<Tables>>,
    target_locks: Arc<Mutex<TargetLocks>>,
    target: VoteTarget,
    held: HashMap<i64, OwnedMutexGuard<()>>,
    votes: HashMap<(UserId, i64), Option<Stance>>,
    deltas: HashMap<i64, i64>,
}

impl MemoryVoteTx {
    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn current_vote(&self, voter_id: UserId, target_id: i64) -> Result<Option<Stance>, StoreError> {
        if let Some(pending) = self.votes.get(&(voter_id, target_id)) {
            return Ok(*pending);
        }
        Ok(self
            .read()?
            .votes
            .get(&(self.target, voter_id, target_id))
            .copied())
    }

    fn missing_vote(&self, voter_id: UserId, target_id: i64) -> StoreError {
        StoreError::NotFound(format!(
            "vote of user {} on {} {}",
            voter_id, self.target, target_id
        ))
    }
}

impl Drop for MemoryVoteTx {
    fn drop(&mut self) {
        let released: Vec<i64> = self.held.drain().map(|(target_id, _)| target_id).collect();
        let Ok(mut locks) = self.target_locks.lock() else {
            return;
        };
        for target_id in released {
            let key = (self.target, target_id);
            // Waiters hold a clone of the Arc, so only idle entries are removed.
            if locks
                .get(&key)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                locks.remove(&key);
            }
        }
    }
}

#[async_trait]
impl VoteStore for InMemoryStore {
    async fn begin(&self, target: VoteTarget) -> Result<Box<dyn VoteTx>, StoreError> {
        Ok(Box::new(MemoryVoteTx {
            tables: Arc::clone(&self.tables),
            target_locks: Arc::clone(&self.target_locks),
            target,
            held: HashMap::new(),
            votes: HashMap::new(),
            deltas: HashMap::new(),
        }))
    }
}

#[async_trait]
impl VoteTx for MemoryVoteTx {
    async fn lock_target(&mut self, target_id: i64) -> Result<Option<i64>, StoreError> {
        if !self.held.contains_key(&target_id) {
            let lock = {
                let mut locks = self
                    .target_locks
                    .lock()
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                Arc::clone(locks.entry((self.target, target_id)).or_default())
            };
            let guard = lock.lock_owned().await;
            self.held.insert(target_id, guard);
        }

        let pending = self.deltas.get(&target_id).copied().unwrap_or(0);
        Ok(self
            .read()?
            .counter(self.target, target_id)
            .map(|c| c + pending))
    }

    async fn find_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
    ) -> Result<Option<Stance>, StoreError> {
        self.current_vote(voter_id, target_id)
    }

    async fn insert_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
        stance: Stance,
    ) -> Result<(), StoreError> {
        {
            let tables = self.read()?;
            if !tables.users.contains_key(&voter_id) {
                return Err(StoreError::NotFound(format!("user {}", voter_id)));
            }
            if tables.counter(self.target, target_id).is_none() {
                return Err(StoreError::NotFound(format!("{} {}", self.target, target_id)));
            }
        }
        if self.current_vote(voter_id, target_id)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "user {} already voted on {} {}",
                voter_id, self.target, target_id
            )));
        }
        self.votes.insert((voter_id, target_id), Some(stance));
        Ok(())
    }

    async fn update_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
        stance: Stance,
    ) -> Result<(), StoreError> {
        if self.current_vote(voter_id, target_id)?.is_none() {
            return Err(self.missing_vote(voter_id, target_id));
        }
        self.votes.insert((voter_id, target_id), Some(stance));
        Ok(())
    }

    async fn delete_vote(&mut self, voter_id: UserId, target_id: i64) -> Result<(), StoreError> {
        if self.current_vote(voter_id, target_id)?.is_none() {
            return Err(self.missing_vote(voter_id, target_id));
        }
        self.votes.insert((voter_id, target_id), None);
        Ok(())
    }

    async fn adjust_counter(&mut self, target_id: i64, delta: i64) -> Result<i64, StoreError> {
        let base = self
            .read()?
            .counter(self.target, target_id)
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", self.target, target_id)))?;
        let pending = self.deltas.entry(target_id).or_default();
        *pending += delta;
        Ok(base + *pending)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        // Validate everything first so a failed commit applies nothing.
        for target_id in self.deltas.keys() {
            if tables.counter(self.target, *target_id).is_none() {
                return Err(StoreError::NotFound(format!("{} {}", self.target, target_id)));
            }
        }

        for ((voter_id, target_id), stance) in &self.votes {
            let key = (self.target, *voter_id, *target_id);
            match stance {
                Some(stance) => tables.votes.insert(key, *stance),
                None => tables.votes.remove(&key),
            };
        }
        for (target_id, delta) in &self.deltas {
            if let Some(counter) = tables.counter_mut(self.target, *target_id) {
                *counter += delta;
            }
        }
        Ok(())
    }
}
