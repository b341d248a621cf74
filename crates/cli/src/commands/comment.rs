//! Comment command - discuss and vote on comments

use anyhow::{Context, Result};
use newsdesk_domain::{NewComment, VoteTarget};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::args::{AuthArgs, CommentArgs, CommentCommands};
use crate::commands::{AppContext, news::toggle, print_json};

pub async fn execute(args: CommentArgs, config_path: Option<PathBuf>) -> Result<()> {
    let ctx = AppContext::open(config_path.as_deref()).await?;
    let comments = ctx.comments();

    match args.command {
        CommentCommands::Create {
            auth,
            news,
            body,
            json,
        } => {
            let claims = ctx.authenticate(&auth)?;
            let comment = comments
                .post(NewComment {
                    author_id: claims.uid,
                    news_id: news,
                    body,
                })
                .await
                .context("Failed to post comment")?;

            if json {
                print_json(&comment)?;
            } else {
                println!("Posted comment {} on news {}", comment.id, comment.news_id);
            }
        }

        CommentCommands::List { news, token, json } => {
            let viewer = match token {
                Some(token) => Some(ctx.authenticate(&AuthArgs { token })?.uid),
                None => None,
            };
            let thread = comments.thread(news, viewer).await?;

            if json {
                print_json(&thread)?;
            } else {
                let mine: HashMap<_, _> = thread
                    .viewer_votes
                    .iter()
                    .map(|v| (v.comment_id, v.stance))
                    .collect();
                if thread.comments.is_empty() {
                    println!("No comments");
                }
                for comment in &thread.comments {
                    let marker = mine
                        .get(&comment.id)
                        .map(|s| format!(" [you: {}]", s))
                        .unwrap_or_default();
                    println!(
                        "{:>5}  {} ({:+}){}",
                        comment.id, comment.author_name, comment.votes, marker
                    );
                    println!("       {}", comment.body);
                }
            }
        }

        CommentCommands::Delete { auth, id } => {
            ctx.authenticate(&auth)?;
            comments.delete(id).await?;
            println!("Deleted comment {}", id);
        }

        CommentCommands::Like(vote) => toggle(&ctx, VoteTarget::Comment, vote).await?,
    }

    Ok(())
}
