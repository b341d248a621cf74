//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// newsdesk: operator CLI for the news publishing backend
#[derive(Parser, Debug)]
#[command(name = "newsdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Database maintenance
    Db(DbArgs),

    /// Accounts and sessions
    User(UserArgs),

    /// News articles
    News(NewsArgs),

    /// Comments on news articles
    Comment(CommentArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

/// Session token of the acting user
#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    /// Session token from `newsdesk user login`
    #[arg(long, env = "NEWSDESK_TOKEN", hide_env_values = true)]
    pub token: String,
}

/// Like or dislike an entity
#[derive(Args, Debug)]
pub struct VoteArgs {
    #[command(flatten)]
    pub auth: AuthArgs,

    /// Id of the article or comment
    pub id: i64,

    /// Like or Dislike (pressing the same stance twice clears the vote)
    #[arg(long, default_value = "Like")]
    pub stance: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommands,
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Create the database and apply the schema
    Migrate,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a new account
    Signup {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "NEWSDESK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in and print a session token
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "NEWSDESK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the account behind a session token
    Whoami {
        #[command(flatten)]
        auth: AuthArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the profile picture
    Avatar {
        #[command(flatten)]
        auth: AuthArgs,

        /// Image file to upload
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct NewsArgs {
    #[command(subcommand)]
    pub command: NewsCommands,
}

#[derive(Subcommand, Debug)]
pub enum NewsCommands {
    /// Publish an article
    Create(CreateNewsArgs),

    /// Show one article
    Show {
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the home page sections
    Home {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every article, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List articles written by a user
    Created {
        /// Author id
        #[arg(long)]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the acting user's saved articles
    Saved {
        #[command(flatten)]
        auth: AuthArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bookmark an article
    Save {
        #[command(flatten)]
        auth: AuthArgs,

        id: i64,
    },

    /// Remove a bookmark
    Unsave {
        #[command(flatten)]
        auth: AuthArgs,

        id: i64,
    },

    /// Delete an article with its comments, votes and images
    Delete {
        #[command(flatten)]
        auth: AuthArgs,

        id: i64,
    },

    /// Toggle a like or dislike on an article
    Like(VoteArgs),
}

#[derive(Args, Debug)]
pub struct CreateNewsArgs {
    #[command(flatten)]
    pub auth: AuthArgs,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub summary: String,

    /// Article body
    #[arg(long, conflicts_with = "content_file", required_unless_present = "content_file")]
    pub content: Option<String>,

    /// File containing the article body (use - for stdin)
    #[arg(long)]
    pub content_file: Option<PathBuf>,

    /// Banner image file
    #[arg(long)]
    pub banner: PathBuf,

    /// Body image file
    #[arg(long)]
    pub image: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommands,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Comment on an article
    Create {
        #[command(flatten)]
        auth: AuthArgs,

        /// Article id
        #[arg(long)]
        news: i64,

        #[arg(long)]
        body: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the comments of an article
    List {
        /// Article id
        #[arg(long)]
        news: i64,

        /// Include the votes of the user behind this token
        #[arg(long, env = "NEWSDESK_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a comment and its votes
    Delete {
        #[command(flatten)]
        auth: AuthArgs,

        id: i64,
    },

    /// Toggle a like or dislike on a comment
    Like(VoteArgs),
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./newsdesk.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
