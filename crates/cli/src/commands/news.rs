//! News command - publish, browse, bookmark and vote on articles

use anyhow::{Context, Result};
use newsdesk_domain::{NewsCard, NewsDraft, VoteTarget};
use std::path::PathBuf;

use crate::args::{CreateNewsArgs, NewsArgs, NewsCommands, VoteArgs};
use crate::commands::{AppContext, print_json, read_image, read_text};

pub async fn execute(args: NewsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let ctx = AppContext::open(config_path.as_deref()).await?;
    let news = ctx.news();

    match args.command {
        NewsCommands::Create(args) => create(&ctx, args).await?,

        NewsCommands::Show { id, json } => {
            let detail = news.detail(id).await?;
            if json {
                print_json(&detail)?;
            } else {
                println!("{}", detail.title);
                println!(
                    "[{}] by {} on {} | {} likes",
                    detail.category,
                    detail.author,
                    detail.created_at.date(),
                    detail.likes
                );
                println!("{}", detail.image_url);
                println!();
                println!("{}", detail.content);
            }
        }

        NewsCommands::Home { json } => {
            let home = news.home_page().await?;
            if json {
                print_json(&home)?;
            } else {
                print_section("Top this month", &home.top);
                print_section("Latest", &home.latest);
                print_section("By category", &home.latest_by_category);
            }
        }

        NewsCommands::List { json } => print_cards(&news.all().await?, json)?,

        NewsCommands::Created { user, json } => {
            print_cards(&news.created_by(user).await?, json)?
        }

        NewsCommands::Saved { auth, json } => {
            let claims = ctx.authenticate(&auth)?;
            print_cards(&news.saved_by(claims.uid).await?, json)?
        }

        NewsCommands::Save { auth, id } => {
            let claims = ctx.authenticate(&auth)?;
            news.save(claims.uid, id).await?;
            println!("Saved news {}", id);
        }

        NewsCommands::Unsave { auth, id } => {
            let claims = ctx.authenticate(&auth)?;
            news.unsave(claims.uid, id).await?;
            println!("Removed news {} from saved", id);
        }

        NewsCommands::Delete { auth, id } => {
            ctx.authenticate(&auth)?;
            let deleted = news.delete(id).await?;
            println!("Deleted news {} ({})", deleted.id, deleted.title);
        }

        NewsCommands::Like(vote) => toggle(&ctx, VoteTarget::News, vote).await?,
    }

    Ok(())
}

async fn create(ctx: &AppContext, args: CreateNewsArgs) -> Result<()> {
    let claims = ctx.authenticate(&args.auth)?;

    let content = match (args.content, &args.content_file) {
        (Some(content), _) => content,
        (None, Some(path)) => read_text(path)?,
        (None, None) => anyhow::bail!("Either --content or --content-file is required"),
    };

    let draft = NewsDraft {
        created_by: claims.uid,
        title: args.title,
        category: args.category,
        content,
        summary: args.summary,
    };
    let banner = read_image(&args.banner)?;
    let image = read_image(&args.image)?;

    let article = ctx
        .news()
        .publish(draft, banner, image)
        .await
        .context("Failed to publish news")?;

    if args.json {
        print_json(&article)?;
    } else {
        println!("Published news {}: {}", article.id, article.title);
    }
    Ok(())
}

/// Shared by `news like` and `comment like`
pub(crate) async fn toggle(ctx: &AppContext, target: VoteTarget, args: VoteArgs) -> Result<()> {
    let claims = ctx.authenticate(&args.auth)?;

    let outcome = ctx
        .votes()
        .toggle_requested(target, claims.uid, args.id, &args.stance)
        .await
        .with_context(|| format!("Failed to vote on {} {}", target, args.id))?;

    if args.json {
        print_json(&outcome)?;
    } else {
        let stance = outcome
            .stance
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{} {}: vote {}, counter {}",
            target, outcome.target_id, stance, outcome.counter
        );
    }
    Ok(())
}

fn print_cards(cards: &[NewsCard], json: bool) -> Result<()> {
    if json {
        return print_json(&cards);
    }
    if cards.is_empty() {
        println!("No news");
    }
    for card in cards {
        print_card(card);
    }
    Ok(())
}

fn print_section(title: &str, cards: &[NewsCard]) {
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    for card in cards {
        print_card(card);
    }
    println!();
}

fn print_card(card: &NewsCard) {
    println!(
        "{:>5}  {:<12} {:>4} likes  {}  ({}, {})",
        card.id,
        card.category,
        card.likes,
        card.title,
        card.author,
        card.created_at.date()
    );
}
