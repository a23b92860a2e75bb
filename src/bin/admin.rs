//! CLI administration tool for link-tracker.
//!
//! Provisions tracked links, shows daily metrics and repairs rollups
//! without any HTTP surface.
//!
//! # Usage
//!
//! ```bash
//! # Create a device-smart link
//! cargo run --bin admin -- link create --organization 1 --activation 3 --slug promo1 \
//!     --ios https://apps.apple.com/x --android https://play.google.com/x \
//!     --fallback https://example.com
//!
//! # Create a single-destination link with a generated slug
//! cargo run --bin admin -- link create --organization 1 --activation 3 --url https://example.com
//!
//! # Inspect or deactivate a link
//! cargo run --bin admin -- link show promo1
//! cargo run --bin admin -- link deactivate promo1
//!
//! # Daily metrics for the last 14 days
//! cargo run --bin admin -- stats promo1 --days 14
//!
//! # Recompute a day's rollup from raw click events
//! cargo run --bin admin -- metrics rebuild promo1 --date 2026-03-14
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` or `DB_*` (required): PostgreSQL connection
//! - `REDIS_URL` or `REDIS_*` (optional): evicts deactivated links from the
//!   redirect cache

use link_tracker::application::services::{LinkDraft, LinkReport, LinkService, StatsService};
use link_tracker::config::Config;
use link_tracker::domain::entities::{DestinationStrategy, TrackedLink};
use link_tracker::infrastructure::cache::{LinkCache, NullCache, RedisCache};
use link_tracker::infrastructure::persistence::{
    PgClickRepository, PgLinkRepository, PgMetricsRepository,
};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing link-tracker.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage tracked links
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Show daily metrics for a link
    Stats {
        /// Link slug
        slug: String,

        /// Number of days to show, ending today (UTC)
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },

    /// Maintain daily rollups
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Link management subcommands.
#[derive(Subcommand)]
enum LinkAction {
    /// Create a tracked link
    Create {
        /// Owning organization id
        #[arg(long)]
        organization: i64,

        /// Activation (campaign) id
        #[arg(long)]
        activation: i64,

        /// Zone id
        #[arg(long)]
        zone: Option<i64>,

        /// Agent id
        #[arg(long)]
        agent: Option<i64>,

        /// Custom slug (generated if omitted)
        #[arg(long)]
        slug: Option<String>,

        /// Destination for every visitor (single link)
        #[arg(long, conflicts_with_all = ["ios", "android", "fallback"])]
        url: Option<String>,

        /// Destination for iOS visitors (smart link)
        #[arg(long)]
        ios: Option<String>,

        /// Destination for Android visitors (smart link)
        #[arg(long)]
        android: Option<String>,

        /// Destination for everyone else (smart link)
        #[arg(long)]
        fallback: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show a link, active or not
    Show {
        /// Link slug
        slug: String,
    },

    /// Deactivate a link; its slug stops resolving
    Deactivate {
        /// Link slug
        slug: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Rollup maintenance subcommands.
#[derive(Subcommand)]
enum MetricsAction {
    /// Recompute one day's rollup from raw click events
    Rebuild {
        /// Link slug
        slug: String,

        /// Day to rebuild (YYYY-MM-DD, UTC)
        #[arg(long)]
        date: NaiveDate,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

type Links = LinkService<PgLinkRepository>;
type Stats = StatsService<PgMetricsRepository, PgClickRepository>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = Config::load_database_url()?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Link { action } => handle_link_action(action, &pool).await?,
        Commands::Stats { slug, days } => handle_stats(&slug, days, &pool).await?,
        Commands::Metrics { action } => handle_metrics_action(action, &pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

fn link_service(pool: &PgPool, cache: Arc<dyn LinkCache>) -> Links {
    let repo = Arc::new(PgLinkRepository::new(Arc::new(pool.clone())));
    LinkService::new(repo, cache)
}

fn stats_service(pool: &PgPool) -> Stats {
    let pool = Arc::new(pool.clone());
    StatsService::new(
        Arc::new(PgMetricsRepository::new(pool.clone())),
        Arc::new(PgClickRepository::new(pool)),
    )
}

/// Connects to the redirect cache when one is configured.
///
/// A deactivation must evict the cached link, otherwise the slug keeps
/// resolving until the entry's TTL runs out.
async fn connect_cache() -> Arc<dyn LinkCache> {
    let Some(redis_url) = Config::load_redis_url() else {
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(&redis_url, 0).await {
        Ok(redis) => Arc::new(redis),
        Err(e) => {
            println!(
                "{}",
                format!("⚠️  Redis unavailable ({e}); cached entries expire with their TTL")
                    .yellow()
            );
            Arc::new(NullCache::new())
        }
    }
}

/// Dispatches link management commands.
async fn handle_link_action(action: LinkAction, pool: &PgPool) -> Result<()> {
    match action {
        LinkAction::Create {
            organization,
            activation,
            zone,
            agent,
            slug,
            url,
            ios,
            android,
            fallback,
            yes,
        } => {
            let draft = LinkDraft {
                organization_id: organization,
                activation_id: activation,
                zone_id: zone,
                agent_id: agent,
                slug,
                single_url: url,
                ios_url: ios,
                android_url: android,
                fallback_url: fallback,
            };
            let service = link_service(pool, Arc::new(NullCache::new()));
            create_link(&service, draft, yes).await?;
        }
        LinkAction::Show { slug } => {
            let service = link_service(pool, Arc::new(NullCache::new()));
            let link = service
                .get_link(&slug)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            print_link(&link);
        }
        LinkAction::Deactivate { slug, yes } => {
            let service = link_service(pool, connect_cache().await);
            deactivate_link(&service, &slug, yes).await?;
        }
    }

    Ok(())
}

/// Creates a tracked link after showing what will be stored.
///
/// # Flow
///
/// 1. Display the draft
/// 2. Confirm creation (unless `--yes` flag)
/// 3. Validate, normalize URLs, generate or check the slug
/// 4. Display the stored link
async fn create_link(service: &Links, draft: LinkDraft, skip_confirm: bool) -> Result<()> {
    println!("{}", "🔗 Create Tracked Link".bright_blue().bold());
    println!();
    println!("  Organization: {}", draft.organization_id.to_string().cyan());
    println!("  Activation:   {}", draft.activation_id.to_string().cyan());
    println!(
        "  Slug:         {}",
        draft
            .slug
            .as_deref()
            .map(|s| s.cyan())
            .unwrap_or_else(|| "(generated)".bright_black())
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this link?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let link = service
        .create_link(draft)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create link: {}", e))?;

    println!("{}", "✅ Link created successfully!".green().bold());
    println!();
    print_link(&link);
    println!(
        "  Share: {}",
        format!("https://<your-host>/r/{}", link.slug).bright_yellow()
    );
    println!();

    Ok(())
}

/// Deactivates a link with confirmation prompt (default: No).
async fn deactivate_link(service: &Links, slug: &str, skip_confirm: bool) -> Result<()> {
    println!("{}", "🔒 Deactivate Tracked Link".bright_blue().bold());
    println!();

    let link = service
        .get_link(slug)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if !link.is_active {
        println!("{}", "⚠️  This link is already inactive".yellow());
        return Ok(());
    }

    print_link(&link);

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Deactivate this link? Visitors will get 404.")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    service
        .deactivate(slug)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to deactivate link: {}", e))?;

    println!("{}", "✅ Link deactivated".green().bold());
    println!();

    Ok(())
}

fn print_link(link: &TrackedLink) {
    let status = if link.is_active {
        "ACTIVE".green()
    } else {
        "INACTIVE".red()
    };

    println!("  ID:           {}", link.id.to_string().bright_black());
    println!("  Slug:         {}", link.slug.cyan().bold());
    println!("  Status:       {}", status);
    println!(
        "  Tenancy:      org {} / activation {} / zone {} / agent {}",
        link.organization_id,
        link.activation_id,
        optional_id(link.zone_id),
        optional_id(link.agent_id)
    );
    println!("  Strategy:     {}", link.destination_strategy.to_string().cyan());

    match link.destination_strategy {
        DestinationStrategy::Single => {
            println!("  URL:          {}", optional_url(&link.single_url));
        }
        DestinationStrategy::Smart => {
            println!("  iOS:          {}", optional_url(&link.ios_url));
            println!("  Android:      {}", optional_url(&link.android_url));
            println!("  Fallback:     {}", optional_url(&link.fallback_url));
        }
    }

    println!(
        "  Created:      {}",
        link.created_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black()
    );
    println!();
}

fn optional_id(id: Option<i64>) -> String {
    id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn optional_url(url: &Option<String>) -> ColoredString {
    match url {
        Some(u) => u.bright_white(),
        None => "(not set)".bright_black(),
    }
}

/// Displays daily metrics for a link.
///
/// # Output Format
///
/// ```text
/// 📊 Daily metrics for promo1 (2026-03-08 .. 2026-03-14)
///
///   Date         Clicks     Valid      Uniques
///   ──────────────────────────────────────────
///   2026-03-13   42         39         31
///   2026-03-14   17         17         15
/// ```
async fn handle_stats(slug: &str, days: u32, pool: &PgPool) -> Result<()> {
    let link = link_service(pool, Arc::new(NullCache::new()))
        .get_link(slug)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let to = Utc::now().date_naive();
    let from = to - Duration::days(i64::from(days.max(1)) - 1);

    let report = stats_service(pool)
        .link_report(&link, from, to)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load metrics: {}", e))?;

    print_report(&report);

    Ok(())
}

fn print_report(report: &LinkReport) {
    println!(
        "{}",
        format!(
            "📊 Daily metrics for {} ({} .. {})",
            report.slug, report.from, report.to
        )
        .bright_blue()
        .bold()
    );
    println!();

    if report.days.is_empty() {
        println!("{}", "  No clicks in this range".yellow());
        println!();
        return;
    }

    println!(
        "  {:<12} {:<10} {:<10} {:<10}",
        "Date".bright_white().bold(),
        "Clicks".bright_white().bold(),
        "Valid".bright_white().bold(),
        "Uniques".bright_white().bold()
    );
    println!("  {}", "─".repeat(42).bright_black());

    for day in &report.days {
        println!(
            "  {:<12} {:<10} {:<10} {:<10}",
            day.date.to_string().bright_black(),
            day.clicks,
            day.valid_clicks,
            day.uniques
        );
    }

    println!();
    println!(
        "  Total: {} clicks, {} valid",
        report.total_clicks.to_string().bright_green().bold(),
        report.total_valid_clicks.to_string().bright_green().bold()
    );

    if !report.is_consistent() {
        println!(
            "{}",
            format!(
                "  ⚠️  Rollups count {} clicks but {} raw events exist; run `admin metrics rebuild`",
                report.total_clicks, report.raw_clicks
            )
            .yellow()
        );
    }
    println!();
}

/// Dispatches rollup maintenance commands.
async fn handle_metrics_action(action: MetricsAction, pool: &PgPool) -> Result<()> {
    match action {
        MetricsAction::Rebuild { slug, date } => {
            println!(
                "{}",
                format!("🔧 Rebuilding {slug} for {date}...").bright_blue()
            );

            let link = link_service(pool, Arc::new(NullCache::new()))
                .get_link(&slug)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            let metric = stats_service(pool)
                .rebuild_day(&link, date)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to rebuild metrics: {}", e))?;

            println!("{}", "✅ Rollup rebuilt".green().bold());
            println!(
                "  Clicks: {}  Valid: {}  Uniques: {}",
                metric.clicks.to_string().bright_green(),
                metric.valid_clicks.to_string().bright_green(),
                metric.uniques.to_string().bright_green()
            );
            println!();
        }
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracked_links")
                .fetch_one(pool)
                .await?;
            let active: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM tracked_links WHERE is_active")
                    .fetch_one(pool)
                    .await?;
            let clicks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM click_events")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL:    {}", version.bright_white());
            println!(
                "  Links:         {} ({} active)",
                links.to_string().bright_green().bold(),
                active.to_string().bright_green()
            );
            println!(
                "  Click events:  {}",
                clicks.to_string().bright_green().bold()
            );
            println!();
        }
    }

    Ok(())
}
