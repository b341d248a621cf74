//! User command - accounts and sessions

use anyhow::{Context, Result};
use newsdesk_domain::NewAccount;
use std::path::PathBuf;

use crate::args::{UserArgs, UserCommands};
use crate::commands::{AppContext, print_json, read_image};

pub async fn execute(args: UserArgs, config_path: Option<PathBuf>) -> Result<()> {
    let ctx = AppContext::open(config_path.as_deref()).await?;

    match args.command {
        UserCommands::Signup {
            username,
            email,
            password,
            json,
        } => {
            let account = ctx
                .accounts()?
                .sign_up(NewAccount {
                    username,
                    email,
                    password,
                })
                .await
                .context("Sign up failed")?;

            if json {
                print_json(&account)?;
            } else {
                println!("Created user {} ({})", account.id, account.email);
            }
        }

        UserCommands::Login {
            email,
            password,
            json,
        } => {
            let session = ctx
                .accounts()?
                .login(&email, &password)
                .await
                .context("Login failed")?;

            if json {
                print_json(&session)?;
            } else {
                // Bare token so it can be captured into NEWSDESK_TOKEN.
                println!("{}", session.token);
            }
        }

        UserCommands::Whoami { auth, json } => {
            let claims = ctx.authenticate(&auth)?;
            if json {
                print_json(&claims)?;
            } else {
                println!("{} <{}>", claims.username, claims.email);
                println!("  id:   {}", claims.uid);
                println!("  role: {}", claims.role.as_str());
                if let Some(pic) = &claims.profile_pic {
                    println!("  pic:  {}", pic);
                }
            }
        }

        UserCommands::Avatar { auth, file } => {
            let accounts = ctx.accounts()?;
            let claims = accounts
                .verify_token(auth.token.trim())
                .context("Authentication failed")?;
            let image = read_image(&file)?;

            let account = accounts
                .change_profile_picture(claims.uid, image)
                .await
                .context("Failed to change profile picture")?;

            println!(
                "Profile picture: {}",
                account.profile_pic.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}
