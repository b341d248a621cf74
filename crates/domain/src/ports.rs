//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{
    Account, AccountRecord, Comment, CommentId, NewComment, NewsArticle, NewsCard, NewsDetail,
    NewsId, NewsRecord, SessionClaims, Stance, StoredAccount, StoredImage, UserId, ViewerVote,
    VoteTarget,
};

/// Error type for persistence operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for opening vote transactions
///
/// Each call hands out a fresh transaction scoped to one entity/table pair.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Begin a transaction on the vote relation of the given target kind
    async fn begin(&self, target: VoteTarget) -> Result<Box<dyn VoteTx>, StoreError>;
}

/// A unit of work over one vote relation and its target's counter
///
/// Dropping the transaction without calling [`VoteTx::commit`] discards every
/// write made through it.
#[async_trait]
pub trait VoteTx: Send {
    /// Lock the target row for the rest of the transaction and return its
    /// current counter, or `None` if the target does not exist
    async fn lock_target(&mut self, target_id: i64) -> Result<Option<i64>, StoreError>;

    /// Point lookup of the voter's record on the target
    async fn find_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
    ) -> Result<Option<Stance>, StoreError>;

    /// Insert a new vote record
    async fn insert_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
        stance: Stance,
    ) -> Result<(), StoreError>;

    /// Change the stance of an existing vote record
    async fn update_vote(
        &mut self,
        voter_id: UserId,
        target_id: i64,
        stance: Stance,
    ) -> Result<(), StoreError>;

    /// Remove an existing vote record
    async fn delete_vote(&mut self, voter_id: UserId, target_id: i64) -> Result<(), StoreError>;

    /// Add `delta` to the target's counter, returning the new value
    async fn adjust_counter(&mut self, target_id: i64, delta: i64) -> Result<i64, StoreError>;

    /// Make every write of this transaction visible atomically
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Port for account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert an account, failing with `Conflict` if the email is taken
    async fn create_account(&self, record: &AccountRecord) -> Result<Account, StoreError>;

    /// Look up an account and its password hash by email
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredAccount>, StoreError>;

    async fn get_account(&self, id: UserId) -> Result<Option<Account>, StoreError>;

    /// Replace the profile picture URL, failing with `NotFound` for unknown users
    async fn set_profile_pic(&self, id: UserId, url: &str) -> Result<Account, StoreError>;
}

/// Port for news persistence
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Insert an article with a zero like counter
    async fn create_news(&self, record: &NewsRecord) -> Result<NewsArticle, StoreError>;

    async fn news_detail(&self, id: NewsId) -> Result<Option<NewsDetail>, StoreError>;

    /// Most liked articles created at or after `since`
    async fn top_news(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<NewsCard>, StoreError>;

    /// Most recent articles, newest first (`None` = no limit)
    async fn latest_news(&self, limit: Option<u32>) -> Result<Vec<NewsCard>, StoreError>;

    /// Up to `per_category` most recent articles of every category
    async fn latest_by_category(&self, per_category: u32) -> Result<Vec<NewsCard>, StoreError>;

    async fn news_by_author(&self, author: UserId) -> Result<Vec<NewsCard>, StoreError>;

    /// Bookmark an article, failing with `Conflict` if already saved
    async fn save_news(&self, user: UserId, news: NewsId) -> Result<(), StoreError>;

    /// Remove a bookmark, returning whether one existed
    async fn unsave_news(&self, user: UserId, news: NewsId) -> Result<bool, StoreError>;

    async fn saved_news(&self, user: UserId) -> Result<Vec<NewsCard>, StoreError>;

    /// Delete an article and everything hanging off it, returning the removed row
    async fn delete_news(&self, id: NewsId) -> Result<Option<NewsArticle>, StoreError>;
}

/// Port for comment persistence
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert a comment with a zero vote counter
    async fn create_comment(
        &self,
        comment: &NewComment,
        created_at: OffsetDateTime,
    ) -> Result<Comment, StoreError>;

    /// Comments of an article, newest first
    async fn comments_for_news(&self, news: NewsId) -> Result<Vec<Comment>, StoreError>;

    /// The viewer's votes on comments of an article
    async fn viewer_votes(
        &self,
        news: NewsId,
        viewer: UserId,
    ) -> Result<Vec<ViewerVote>, StoreError>;

    /// Delete a comment and its votes, returning whether it existed
    async fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError>;
}

/// Error type for image storage
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// Port for object storage of uploaded images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an object and make it publicly readable
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, ImageError>;

    /// Remove an object, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, ImageError>;

    /// Map a public URL back to the object key, if it points into this store
    fn key_for_url(&self, url: &str) -> Option<String>;
}

/// Error type for credential operations
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Hashing error: {0}")]
    Hashing(String),
    #[error("Signing error: {0}")]
    Signing(String),
}

/// Port for password hashing
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, CredentialError>;

    /// Check a password against a stored hash; malformed hashes never verify
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Port for signing and verifying session tokens
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, claims: &SessionClaims) -> Result<String, CredentialError>;

    fn verify(&self, token: &str) -> Result<SessionClaims, CredentialError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
