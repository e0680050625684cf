//! CLI module for quota administration.
//!
//! This module provides the command-line interface for managing quota
//! records in the SQL store.
//!
//! # Usage
//!
//! ```bash
//! # Initialize database schema
//! quota-admin init -d sqlite:quota.db
//!
//! # Add a user
//! quota-admin add-user -d sqlite:quota.db -u 550e8400-e29b-41d4-a716-446655440000 -p free
//!
//! # Change a plan
//! quota-admin set-plan -d sqlite:quota.db -u 550e8400-... -p paid
//!
//! # List usage
//! quota-admin list -d sqlite:quota.db
//!
//! # Purge stale anonymous records
//! quota-admin purge-anonymous -d sqlite:quota.db --days 30
//! ```

use clap::{Parser, Subcommand};
use sqlx::Row;
use tabled::{Table, Tabled};

use genquota_core::defaults::DEFAULT_ANONYMOUS_RETENTION_DAYS;
use genquota_core::PlanTier;

use crate::sql::{SqlStore, SqlStoreConfig};
use crate::traits::UsageStore;

/// Quota administration CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "quota-admin", version, about = "Manage genquota usage records")]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommands,
}

/// Admin CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Initialize database schema.
    Init {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,
    },

    /// Add a new user row.
    AddUser {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User identifier.
        #[arg(short, long)]
        user_id: String,

        /// Plan tier (free, paid).
        #[arg(short, long, default_value = "free")]
        plan: String,
    },

    /// Change a user's plan.
    SetPlan {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User identifier.
        #[arg(short, long)]
        user_id: String,

        /// Plan tier (free, paid).
        #[arg(short, long)]
        plan: String,
    },

    /// Show one principal's usage.
    Show {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User identifier.
        #[arg(short, long, group = "target")]
        user_id: Option<String>,

        /// Anonymous fingerprint.
        #[arg(short, long, group = "target")]
        fingerprint: Option<String>,
    },

    /// List usage rows.
    List {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// List anonymous fingerprints instead of users.
        #[arg(long)]
        anonymous: bool,

        /// Output format (table, csv).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Reset a user's usage count.
    ResetUsage {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User identifier (or "all" for all users).
        #[arg(short, long)]
        user_id: String,
    },

    /// Delete anonymous records idle longer than the retention window.
    PurgeAnonymous {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// Retention window in days since last activity.
        #[arg(long, default_value_t = DEFAULT_ANONYMOUS_RETENTION_DAYS)]
        days: u32,
    },

    /// Show record counts and usage totals.
    Stats {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,
    },
}

/// User row for display.
#[derive(Tabled)]
struct UserDisplay {
    #[tabled(rename = "User ID")]
    user_id: String,
    #[tabled(rename = "Plan")]
    plan: String,
    #[tabled(rename = "Usage")]
    usage_count: i64,
    #[tabled(rename = "Last Usage")]
    last_usage_date: String,
}

/// Anonymous row for display.
#[derive(Tabled)]
struct AnonymousDisplay {
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
    #[tabled(rename = "Usage")]
    usage_count: i64,
    #[tabled(rename = "Last Activity")]
    updated_at: i64,
}

/// Run the admin CLI with the given arguments.
pub async fn run(args: AdminArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        AdminCommands::Init { database } => init_schema(&database).await,
        AdminCommands::AddUser {
            database,
            user_id,
            plan,
        } => add_user(&database, &user_id, &plan).await,
        AdminCommands::SetPlan {
            database,
            user_id,
            plan,
        } => set_plan(&database, &user_id, &plan).await,
        AdminCommands::Show {
            database,
            user_id,
            fingerprint,
        } => show(&database, user_id.as_deref(), fingerprint.as_deref()).await,
        AdminCommands::List {
            database,
            anonymous,
            format,
        } => list(&database, anonymous, &format).await,
        AdminCommands::ResetUsage { database, user_id } => reset_usage(&database, &user_id).await,
        AdminCommands::PurgeAnonymous { database, days } => {
            purge_anonymous(&database, days).await
        }
        AdminCommands::Stats { database } => stats(&database).await,
    }
}

/// Connect with a single-connection pool for admin work.
async fn connect(url: &str) -> Result<SqlStore, Box<dyn std::error::Error>> {
    let config = SqlStoreConfig::new(url).max_connections(1);
    Ok(SqlStore::connect(config).await?)
}

fn is_postgres(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

async fn init_schema(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    store.init_schema().await?;
    println!("Database schema initialized successfully.");
    Ok(())
}

async fn add_user(url: &str, user_id: &str, plan: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let plan = PlanTier::parse(plan);

    let query = if is_postgres(url) {
        "INSERT INTO quota_users (user_id, plan) VALUES ($1, $2)"
    } else {
        "INSERT INTO quota_users (user_id, plan) VALUES (?, ?)"
    };

    sqlx::query(query)
        .bind(user_id)
        .bind(plan.as_str())
        .execute(store.pool())
        .await?;

    println!("User added successfully.");
    println!("  User ID: {}", user_id);
    println!("  Plan: {}", plan);
    Ok(())
}

async fn set_plan(url: &str, user_id: &str, plan: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let plan = PlanTier::parse(plan);

    let query = if is_postgres(url) {
        "UPDATE quota_users SET plan = $1 WHERE user_id = $2"
    } else {
        "UPDATE quota_users SET plan = ? WHERE user_id = ?"
    };

    let result = sqlx::query(query)
        .bind(plan.as_str())
        .bind(user_id)
        .execute(store.pool())
        .await?;

    if result.rows_affected() > 0 {
        println!("Plan updated to '{}'.", plan);
    } else {
        println!("No user found with user_id: {}", user_id);
    }
    Ok(())
}

async fn show(
    url: &str,
    user_id: Option<&str>,
    fingerprint: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;

    if let Some(user_id) = user_id {
        match store.find_user(user_id).await? {
            Some(record) => {
                println!("User ID: {}", record.user_id);
                println!("Plan: {}", record.plan);
                println!("Usage count: {}", record.usage_count);
                println!(
                    "Last usage: {}",
                    record
                        .last_usage_date
                        .map(genquota_core::dates::format_date)
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            None => println!("No user found with user_id: {}", user_id),
        }
    } else if let Some(fingerprint) = fingerprint {
        match store.find_anonymous(fingerprint).await? {
            Some(record) => {
                println!("Fingerprint: {}", record.fingerprint);
                println!("Usage count: {}", record.usage_count);
                println!("Last activity: {}", record.updated_at);
            }
            None => println!("No record found for fingerprint: {}", fingerprint),
        }
    } else {
        return Err("Must specify --user-id or --fingerprint".into());
    }
    Ok(())
}

async fn list(url: &str, anonymous: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;

    if anonymous {
        let rows = sqlx::query(
            "SELECT fingerprint_hash, usage_count, updated_at FROM anonymous_usage ORDER BY id",
        )
        .fetch_all(store.pool())
        .await?;

        if rows.is_empty() {
            println!("No anonymous usage records found.");
            return Ok(());
        }

        let records: Vec<AnonymousDisplay> = rows
            .iter()
            .map(|row| AnonymousDisplay {
                fingerprint: row.try_get("fingerprint_hash").unwrap_or_default(),
                usage_count: row.try_get("usage_count").unwrap_or(0),
                updated_at: row.try_get("updated_at").unwrap_or(0),
            })
            .collect();

        print_rows(records, format, "fingerprint,usage_count,updated_at", |r| {
            format!("{},{},{}", r.fingerprint, r.usage_count, r.updated_at)
        });
    } else {
        let rows = sqlx::query(
            "SELECT user_id, plan, usage_count, last_usage_date FROM quota_users ORDER BY id",
        )
        .fetch_all(store.pool())
        .await?;

        if rows.is_empty() {
            println!("No users found.");
            return Ok(());
        }

        let records: Vec<UserDisplay> = rows
            .iter()
            .map(|row| UserDisplay {
                user_id: row.try_get("user_id").unwrap_or_default(),
                plan: row.try_get("plan").unwrap_or_default(),
                usage_count: row.try_get("usage_count").unwrap_or(0),
                last_usage_date: row
                    .try_get::<String, _>("last_usage_date")
                    .unwrap_or_else(|_| "-".to_string()),
            })
            .collect();

        print_rows(
            records,
            format,
            "user_id,plan,usage_count,last_usage_date",
            |r| {
                format!(
                    "{},{},{},{}",
                    r.user_id, r.plan, r.usage_count, r.last_usage_date
                )
            },
        );
    }
    Ok(())
}

fn print_rows<T: Tabled>(records: Vec<T>, format: &str, header: &str, csv: impl Fn(&T) -> String) {
    match format {
        "csv" => {
            println!("{}", header);
            for record in &records {
                println!("{}", csv(record));
            }
        }
        _ => {
            println!("{}", Table::new(records));
        }
    }
}

async fn reset_usage(url: &str, user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;

    let affected = if user_id == "all" {
        sqlx::query("UPDATE quota_users SET usage_count = 0, last_usage_date = NULL")
            .execute(store.pool())
            .await?
            .rows_affected()
    } else {
        let query = if is_postgres(url) {
            "UPDATE quota_users SET usage_count = 0, last_usage_date = NULL WHERE user_id = $1"
        } else {
            "UPDATE quota_users SET usage_count = 0, last_usage_date = NULL WHERE user_id = ?"
        };
        sqlx::query(query)
            .bind(user_id)
            .execute(store.pool())
            .await?
            .rows_affected()
    };

    if affected > 0 {
        println!("Usage reset for {} user(s).", affected);
    } else {
        println!("No user found matching the criteria.");
    }
    Ok(())
}

async fn purge_anonymous(url: &str, days: u32) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let cutoff = time::OffsetDateTime::now_utc() - time::Duration::days(i64::from(days));
    let removed = store.purge_anonymous_before(cutoff).await?;
    println!("Removed {} anonymous record(s) idle for over {} days.", removed, days);
    Ok(())
}

async fn stats(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;

    let users: i64 = sqlx::query("SELECT COUNT(*) AS n FROM quota_users")
        .fetch_one(store.pool())
        .await?
        .try_get("n")
        .unwrap_or(0);

    let anonymous: i64 = sqlx::query("SELECT COUNT(*) AS n FROM anonymous_usage")
        .fetch_one(store.pool())
        .await?
        .try_get("n")
        .unwrap_or(0);

    let anonymous_usage: i64 = sqlx::query("SELECT COALESCE(SUM(usage_count), 0) AS n FROM anonymous_usage")
        .fetch_one(store.pool())
        .await?
        .try_get("n")
        .unwrap_or(0);

    println!("Users: {}", users);
    println!("Anonymous records: {}", anonymous);
    println!("Total anonymous generations: {}", anonymous_usage);
    Ok(())
}
