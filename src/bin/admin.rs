//! Command-line administration for smartlink.
//!
//! Manages API tokens, inspects links, purges expired guest links and checks
//! the database without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin admin -- token create --name "Marketing"
//! cargo run --bin admin -- token list
//! cargo run --bin admin -- token revoke Marketing
//! cargo run --bin admin -- links inspect spring-sale
//! cargo run --bin admin -- links purge-guests --yes
//! cargo run --bin admin -- stats
//! cargo run --bin admin -- db check
//! ```
//!
//! Reads the same environment as the server (`DATABASE_URL` or `DB_*`,
//! `TOKEN_SIGNING_SECRET`).

use smartlink::application::services::{LinkService, hash_token};
use smartlink::config::{self, Config};
use smartlink::domain::entities::Link;
use smartlink::domain::repositories::{LinkRepository, TokenRepository};
use smartlink::infrastructure::persistence::{PgLinkRepository, PgTokenRepository};
use smartlink::server::connect_pool;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};
use rand::RngCore;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about = "Administration tool for smartlink", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage API tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Inspect and maintain links
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// Show totals
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Create a new API token
    Create {
        /// Token name (e.g. "Marketing", "CI")
        #[arg(short, long)]
        name: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List all tokens
    List,

    /// Revoke a token
    Revoke {
        /// Token name or ID
        name_or_id: String,
    },
}

#[derive(Subcommand)]
enum LinksAction {
    /// Show a link with its routing rules and limits
    Inspect {
        code: String,
    },

    /// Delete guest links whose TTL has passed
    PurgeGuests {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show server version
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;
    let pool = connect_pool(&config).await?;

    match cli.command {
        Commands::Token { action } => handle_token_action(action, &pool, &config).await?,
        Commands::Links { action } => handle_links_action(action, &pool).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

async fn handle_token_action(action: TokenAction, pool: &PgPool, config: &Config) -> Result<()> {
    let repo = PgTokenRepository::new(Arc::new(pool.clone()));

    match action {
        TokenAction::Create { name, yes } => {
            create_token(&repo, &config.token_signing_secret, name, yes).await
        }
        TokenAction::List => list_tokens(&repo).await,
        TokenAction::Revoke { name_or_id } => revoke_token(&repo, name_or_id).await,
    }
}

/// Creates a token and prints it once.
///
/// Only the HMAC of the token (keyed by `TOKEN_SIGNING_SECRET`) is stored.
/// Links created or claimed with the token are owned by its ID.
async fn create_token(
    repo: &PgTokenRepository,
    signing_secret: &str,
    name: Option<String>,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "Create API token".bright_blue().bold());
    println!();

    let token_name = match name {
        Some(n) => n,
        None => Input::new()
            .with_prompt("Token name")
            .with_initial_text("Marketing")
            .interact_text()?,
    };

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("Create token '{token_name}'?"))
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    let token_value = generate_token();
    let created = repo
        .create_token(&token_name, &hash_token(signing_secret, &token_value))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create token: {e}"))?;

    println!();
    println!("{}", "Token created".green().bold());
    println!("  ID:    {}", created.id.to_string().bright_black());
    println!("  Name:  {}", created.name.cyan());
    println!("  Token: {}", token_value.bright_yellow().bold());
    println!();
    println!(
        "{}",
        "Save this token now. It cannot be shown again.".red().bold()
    );
    println!();
    println!(
        "  curl -H \"Authorization: Bearer {}\" http://localhost:3000/api/links",
        token_value.bright_yellow()
    );
    println!();

    Ok(())
}

async fn list_tokens(repo: &PgTokenRepository) -> Result<()> {
    let tokens = repo
        .list_tokens()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list tokens: {e}"))?;

    if tokens.is_empty() {
        println!("{}", "No tokens found".yellow());
        println!("  Create one with: {}", "admin token create".bright_cyan());
        return Ok(());
    }

    println!(
        "  {:<5} {:<30} {:<17} {:<17} {:<8}",
        "ID".bright_white().bold(),
        "Name".bright_white().bold(),
        "Created".bright_white().bold(),
        "Last used".bright_white().bold(),
        "Status".bright_white().bold()
    );
    println!("  {}", "-".repeat(80).bright_black());

    for token in &tokens {
        let status = if token.is_revoked() {
            "REVOKED".red()
        } else {
            "ACTIVE".green()
        };
        let last_used = token
            .last_used_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  {:<5} {:<30} {:<17} {:<17} {}",
            token.id.to_string().bright_black(),
            token.name.cyan(),
            token.created_at.format("%Y-%m-%d %H:%M").to_string(),
            last_used,
            status
        );
    }

    println!();
    println!("  Total: {}", tokens.len().to_string().bold());

    Ok(())
}

/// Revokes a token looked up by numeric ID or exact name.
async fn revoke_token(repo: &PgTokenRepository, name_or_id: String) -> Result<()> {
    let token = match name_or_id.parse::<i64>() {
        Ok(id) => repo.find_by_id(id).await,
        Err(_) => repo.find_by_name(&name_or_id).await,
    }
    .map_err(|e| anyhow::anyhow!("Database error: {e}"))?
    .context("Token not found")?;

    if token.is_revoked() {
        println!("{}", "This token is already revoked".yellow());
        return Ok(());
    }

    println!("  Token: {}", token.name.cyan());
    println!("  ID:    {}", token.id.to_string().bright_black());

    let confirmed = Confirm::new()
        .with_prompt("Revoke this token?")
        .default(false)
        .interact()?;

    if !confirmed {
        println!("{}", "Cancelled".red());
        return Ok(());
    }

    repo.revoke_token(token.id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to revoke token: {e}"))?;

    println!("{}", "Token revoked".green().bold());
    Ok(())
}

async fn handle_links_action(action: LinksAction, pool: &PgPool) -> Result<()> {
    let repo = Arc::new(PgLinkRepository::new(Arc::new(pool.clone())));

    match action {
        LinksAction::Inspect { code } => {
            let link = repo
                .find_by_code(&code)
                .await
                .map_err(|e| anyhow::anyhow!("Database error: {e}"))?
                .with_context(|| format!("No active link with code '{code}'"))?;
            print_link(&link);
        }
        LinksAction::PurgeGuests { yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Permanently delete expired guest links and their clicks?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled".red());
                    return Ok(());
                }
            }

            let removed = LinkService::new(repo)
                .purge_expired_guests(Utc::now())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to purge guest links: {e}"))?;

            println!(
                "{} {}",
                "Removed guest links:".green().bold(),
                removed.to_string().bold()
            );
        }
    }

    Ok(())
}

fn print_link(link: &Link) {
    let now = Utc::now();
    let state = if link.is_guest_expired(now) || link.is_outside_window(now) {
        "EXPIRED".red()
    } else if link.is_click_limit_reached() {
        "LIMIT REACHED".red()
    } else {
        "ACTIVE".green()
    };

    println!("{} {}", link.code.bright_blue().bold(), state);
    println!("  Destination: {}", link.original_url.cyan());

    if let Some(smart) = &link.smart_redirects {
        for (platform, url) in [
            ("ios", &smart.ios),
            ("android", &smart.android),
            ("desktop", &smart.desktop),
        ] {
            if let Some(url) = url {
                println!("  Smart {platform:<8} {url}");
            }
        }
    }

    if let Some(geo) = &link.geo_redirects {
        for (country, url) in geo {
            println!("  Geo   {country:<8} {url}");
        }
    }

    if let Some(ab) = &link.ab_test {
        let label = if ab.is_active() { "on" } else { "off" };
        println!("  A/B test ({label})");
        for v in &ab.variants {
            println!("    {:<10} weight {:<5} {}", v.id, v.weight, v.url);
        }
    }

    let window = |t: Option<chrono::DateTime<Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };
    println!("  Window:      {} .. {}", window(link.start_date), window(link.expiration_date));
    println!(
        "  Clicks:      {} / {}",
        link.clicks,
        link.max_clicks
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unlimited".to_string())
    );
    println!("  Password:    {}", if link.is_password_protected() { "yes" } else { "no" });
    if link.is_guest {
        println!("  Guest until: {}", window(link.expires_at));
    }
    if let Some(owner) = link.owner_id {
        println!("  Owner token: {owner}");
    }
}

async fn handle_stats(pool: &PgPool) -> Result<()> {
    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;
    let guests: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM links WHERE deleted_at IS NULL AND is_guest",
    )
    .fetch_one(pool)
    .await?;
    let clicks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM link_clicks")
        .fetch_one(pool)
        .await?;
    let tokens: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_tokens WHERE revoked_at IS NULL")
            .fetch_one(pool)
            .await?;

    println!("{}", "Statistics".bright_blue().bold());
    println!("  Links:         {}", links.to_string().bright_green().bold());
    println!("  Guest links:   {}", guests.to_string().bright_green().bold());
    println!("  Clicks:        {}", clicks.to_string().bright_green().bold());
    println!("  Active tokens: {}", tokens.to_string().bright_green().bold());

    Ok(())
}

async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;
            println!("  PostgreSQL: {}", version.bright_white());
        }
    }

    Ok(())
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
