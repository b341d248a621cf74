//! Application use cases / business logic

pub mod accounts;
pub mod comments;
pub mod news;
pub mod vote;

pub use accounts::{AccountConfig, AccountError, AccountService};
pub use comments::CommentService;
pub use news::{ContentError, NewsConfig, NewsService};
pub use vote::{VoteEngine, VoteError};
