//! PRP Server — moderator command line for the press release portal.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use prp_core::repository::Pagination;
use prp_db::{DbConfig, PortalStore};
use prp_portal::{
    AccountService, InviteService, ModerationDecision, PortalConfig, PressReleaseService,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "prp-server", about = "Press release portal moderator tools")]
struct Cli {
    /// Path to a TOML configuration file with `[portal]` and `[database]`
    /// tables. CLI flags and env vars override the database settings.
    #[arg(long, env = "PRP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level for the portal crates: "trace", "debug", "info", "warn",
    /// "error". `RUST_LOG` takes precedence when set.
    #[arg(long, default_value = "info", env = "PRP_LOG_LEVEL")]
    log_level: String,

    /// SurrealDB endpoint, e.g. `ws://127.0.0.1:8000` or `mem://`.
    #[arg(long, env = "PRP_DB_URL")]
    db_url: Option<String>,

    #[arg(long, env = "PRP_DB_NAMESPACE")]
    db_namespace: Option<String>,

    #[arg(long, env = "PRP_DB_DATABASE")]
    db_database: Option<String>,

    #[arg(long, env = "PRP_DB_USERNAME")]
    db_username: Option<String>,

    #[arg(long, env = "PRP_DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    /// Apply pending migrations before running the command.
    #[arg(long, env = "PRP_DB_MIGRATE")]
    db_migrate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// List accounts and releases waiting for a moderator.
    ReviewQueue {
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
    /// Approve an account.
    ApproveAccount { account_id: String },
    /// Reject an account.
    RejectAccount { account_id: String },
    /// Issue an invite code on behalf of an approved member.
    IssueInvite {
        #[arg(long)]
        issuer: String,
        #[arg(long, default_value_t = 1)]
        max_uses: u32,
        /// Restrict redemption to emails of this domain.
        #[arg(long)]
        domain: Option<String>,
        /// Days until the code expires.
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
    /// Approve or reject a press release.
    Moderate {
        release_id: Uuid,
        #[arg(value_enum)]
        decision: Decision,
    },
    /// Fuzzy search over the public feed.
    Search { query: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for ModerationDecision {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Approve => ModerationDecision::Approve,
            Decision::Reject => ModerationDecision::Reject,
        }
    }
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerConfig {
    portal: PortalConfig,
    database: DbConfig,
}

impl ServerConfig {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let config: ServerConfig = toml::from_str(&contents)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            None => ServerConfig::default(),
        };
        config.portal.validate()?;

        let db = &mut config.database;
        for (slot, value) in [
            (&mut db.url, &cli.db_url),
            (&mut db.namespace, &cli.db_namespace),
            (&mut db.database, &cli.db_database),
            (&mut db.username, &cli.db_username),
            (&mut db.password, &cli.db_password),
        ] {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }
        db.migrate_on_connect |= cli.db_migrate;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn").add_directive(format!("prp={}", cli.log_level).parse()?),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    let config = ServerConfig::load(&cli)?;
    let store = PortalStore::open(&config.database)
        .await
        .context("failed to open the portal store")?;

    let accounts = AccountService::new(store.accounts(), config.portal.clone());

    match cli.command {
        Command::Migrate => {
            store.migrate().await?;
        }
        Command::ReviewQueue { limit } => {
            let releases = PressReleaseService::new(
                store.releases(),
                accounts.clone(),
                config.portal.clone(),
            );
            let pending_accounts = accounts.review_queue(Pagination::first(limit)).await?;
            println!("accounts pending review: {}", pending_accounts.total);
            for account in &pending_accounts.items {
                println!("  {}  {}  since {}", account.id, account.email, account.created_at);
            }
            let pending_releases = releases.moderation_queue(Pagination::first(limit)).await?;
            println!("releases pending moderation: {}", pending_releases.total);
            for release in &pending_releases.items {
                println!(
                    "  {}  {}  by {}",
                    release.id, release.fields.headline, release.owner_email
                );
            }
        }
        Command::ApproveAccount { account_id } => {
            let outcome = accounts.moderator_approve(&account_id).await?;
            println!("{}: {}", outcome.account.id, outcome.account.trust_state);
        }
        Command::RejectAccount { account_id } => {
            let outcome = accounts.moderator_reject(&account_id).await?;
            println!("{}: {}", outcome.account.id, outcome.account.trust_state);
        }
        Command::IssueInvite {
            issuer,
            max_uses,
            domain,
            expires_in_days,
        } => {
            let invites = InviteService::new(
                store.invites(),
                accounts,
                config.portal.clone(),
            );
            let expires_at = expires_in_days.map(|days| Utc::now() + Duration::days(days));
            let invite = invites
                .issue(&issuer, max_uses, domain.as_deref(), expires_at)
                .await?;
            println!("{}", invite.code);
        }
        Command::Moderate {
            release_id,
            decision,
        } => {
            let releases = PressReleaseService::new(
                store.releases(),
                accounts,
                config.portal.clone(),
            );
            let release = releases.moderate(release_id, decision.into()).await?;
            println!("{}: {:?}", release.id, release.status);
        }
        Command::Search { query } => {
            let releases = PressReleaseService::new(
                store.releases(),
                accounts,
                config.portal.clone(),
            );
            for release in releases.public_feed(&query).await? {
                println!(
                    "{}  {}  ({})",
                    release.id, release.fields.headline, release.fields.location
                );
            }
        }
    }

    Ok(())
}
