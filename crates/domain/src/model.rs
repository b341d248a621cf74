//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Identifier of a registered account
pub type UserId = i64;
/// Identifier of a news article
pub type NewsId = i64;
/// Identifier of a comment
pub type CommentId = i64;

/// A voter's expressed direction on a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    /// Like
    #[serde(rename = "Like")]
    Up,
    /// Dislike
    #[serde(rename = "Dislike")]
    Down,
}

impl Stance {
    /// Contribution of one record with this stance to the aggregate counter
    pub fn sign(self) -> i64 {
        match self {
            Stance::Up => 1,
            Stance::Down => -1,
        }
    }

    /// The persisted label (`Like` / `Dislike`)
    pub fn as_label(self) -> &'static str {
        match self {
            Stance::Up => "Like",
            Stance::Down => "Dislike",
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Error returned when a requested stance is neither up nor down
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stance '{0}': expected Like or Dislike")]
pub struct InvalidStance(pub String);

impl FromStr for Stance {
    type Err = InvalidStance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" | "up" | "+1" => Ok(Stance::Up),
            "dislike" | "down" | "-1" => Ok(Stance::Down),
            _ => Err(InvalidStance(s.to_string())),
        }
    }
}

/// Which entity kind a vote applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTarget {
    /// A news article (`likes` counter)
    News,
    /// A comment (`votes` counter)
    Comment,
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTarget::News => f.write_str("news"),
            VoteTarget::Comment => f.write_str("comment"),
        }
    }
}

/// One step of the like/dislike toggle
///
/// Pressing a stance with no vote casts it, pressing the same stance again
/// clears it, and pressing the opposite stance flips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteTransition {
    Cast { stance: Stance },
    Cleared { stance: Stance },
    Flipped { from: Stance, to: Stance },
}

impl VoteTransition {
    /// Resolve the transition for the existing vote and the requested stance
    pub fn resolve(existing: Option<Stance>, requested: Stance) -> Self {
        match existing {
            None => VoteTransition::Cast { stance: requested },
            Some(current) if current == requested => VoteTransition::Cleared { stance: current },
            Some(current) => VoteTransition::Flipped {
                from: current,
                to: requested,
            },
        }
    }

    /// Additive change to the target's aggregate counter
    pub fn counter_delta(&self) -> i64 {
        match *self {
            VoteTransition::Cast { stance } => stance.sign(),
            VoteTransition::Cleared { stance } => -stance.sign(),
            // Both the old and the new record change the net sum.
            VoteTransition::Flipped { from, to } => to.sign() - from.sign(),
        }
    }

    /// The vote record left behind by this transition
    pub fn resulting_stance(&self) -> Option<Stance> {
        match *self {
            VoteTransition::Cast { stance } => Some(stance),
            VoteTransition::Cleared { .. } => None,
            VoteTransition::Flipped { to, .. } => Some(to),
        }
    }
}

/// Result of a successful toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub target: VoteTarget,
    pub target_id: i64,
    pub voter_id: UserId,
    pub transition: VoteTransition,
    /// Stance recorded after the toggle, if any
    pub stance: Option<Stance>,
    /// Aggregate counter after the toggle
    pub counter: i64,
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A registered account, without credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Public URL of the profile picture (None = default picture)
    pub profile_pic: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Sign-up request
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Account row as handed to the store for insertion
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

/// Account together with its password hash, used only for login
#[derive(Debug, Clone)]
pub struct StoredAccount {
    pub account: Account,
    pub password_hash: String,
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub uid: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile_pic: Option<String>,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub account: Account,
    pub token: String,
}

/// Article fields supplied by an author
#[derive(Debug, Clone)]
pub struct NewsDraft {
    pub created_by: UserId,
    pub title: String,
    pub category: String,
    pub content: String,
    pub summary: String,
}

/// Article row as handed to the store for insertion
#[derive(Debug, Clone)]
pub struct NewsRecord {
    pub draft: NewsDraft,
    pub banner_url: String,
    pub image_url: String,
    pub created_at: OffsetDateTime,
}

/// A stored news article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: NewsId,
    pub created_by: UserId,
    pub title: String,
    pub category: String,
    pub banner_url: String,
    pub image_url: String,
    pub content: String,
    pub summary: String,
    pub likes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Article as shown on the detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsDetail {
    pub id: NewsId,
    pub category: String,
    pub title: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub likes: i64,
    pub image_url: String,
    pub content: String,
}

/// Compact article listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsCard {
    pub id: NewsId,
    pub title: String,
    pub category: String,
    pub banner_url: String,
    pub summary: String,
    pub author: String,
    pub likes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Landing page sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HomePage {
    /// Most liked articles of the last month
    pub top: Vec<NewsCard>,
    /// Most recent articles overall
    pub latest: Vec<NewsCard>,
    /// Most recent articles of each category
    pub latest_by_category: Vec<NewsCard>,
}

/// Comment submission
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author_id: UserId,
    pub news_id: NewsId,
    pub body: String,
}

/// A stored comment joined with its author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub news_id: NewsId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_pic: Option<String>,
    pub body: String,
    pub votes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The viewer's own vote on one comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerVote {
    pub comment_id: CommentId,
    pub stance: Stance,
}

/// Comments of one article plus the viewer's votes on them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentThread {
    pub comments: Vec<Comment>,
    pub viewer_votes: Vec<ViewerVote>,
}

/// An image submitted for upload
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An object persisted in image storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub key: String,
    pub public_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_parsing_accepts_labels_and_aliases() {
        assert_eq!("Like".parse::<Stance>(), Ok(Stance::Up));
        assert_eq!(" dislike ".parse::<Stance>(), Ok(Stance::Down));
        assert_eq!("up".parse::<Stance>(), Ok(Stance::Up));
        assert_eq!("-1".parse::<Stance>(), Ok(Stance::Down));
        assert_eq!(
            "sideways".parse::<Stance>(),
            Err(InvalidStance("sideways".to_string()))
        );
    }

    #[test]
    fn test_stance_serializes_as_persisted_label() {
        assert_eq!(serde_json::to_string(&Stance::Up).unwrap(), "\"Like\"");
        assert_eq!(
            serde_json::from_str::<Stance>("\"Dislike\"").unwrap(),
            Stance::Down
        );
    }

    #[test]
    fn test_flip_swings_by_two() {
        let t = VoteTransition::resolve(Some(Stance::Down), Stance::Up);
        assert_eq!(t.counter_delta(), 2);
    }
}
