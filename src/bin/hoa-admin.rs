use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hoa_portal::authz::Role;
use hoa_portal::config::load_env;
use hoa_portal::db::MIGRATOR;
use hoa_portal::jwt::JwtConfig;
use hoa_portal::models::actor::NewActor;
use hoa_portal::services::{MutationOutcome, PermissionService};
use hoa_portal::store::SqliteActorStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "HOA portal administration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create an actor (the first admin is usually bootstrapped this way)
    CreateActor {
        email: String,
        #[arg(long, default_value = "user")]
        role: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Grant a named permission to an actor
    Grant { actor_id: Uuid, permission: String },
    /// Revoke a named permission from an actor
    Revoke { actor_id: Uuid, permission: String },
    /// Replace an actor's role
    SetRole { actor_id: Uuid, role: String },
    /// Print a bearer token for an actor, signed with JWT_SECRET
    IssueToken { actor_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            MIGRATOR.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            print_status(&pool).await?;
        }
        Commands::CreateActor { email, role, display_name } => {
            let role = Role::from_str(&role)?;
            let pool = get_pool().await?;
            let store = SqliteActorStore::new(pool);

            if let Some(existing) = store.find_by_email(&email).await? {
                anyhow::bail!("actor already exists: {} {}", existing.id, existing.email);
            }

            let mut new = NewActor::new(email, role);
            if let Some(name) = display_name {
                new = new.with_display_name(name);
            }
            let actor = store.insert(new).await.context("failed to create actor")?;
            println!("{} {} {}", actor.id, actor.email, actor.role);
        }
        Commands::Grant { actor_id, permission } => {
            let service = get_service().await?;
            let outcome = service.grant_permission(actor_id, &permission).await?;
            print_outcome(&outcome);
        }
        Commands::Revoke { actor_id, permission } => {
            let service = get_service().await?;
            let outcome = service.revoke_permission(actor_id, &permission).await?;
            print_outcome(&outcome);
        }
        Commands::SetRole { actor_id, role } => {
            let role = Role::from_str(&role)?;
            let service = get_service().await?;
            let outcome = service.set_role(actor_id, role).await?;
            print_outcome(&outcome);
        }
        Commands::IssueToken { actor_id } => {
            let jwt = JwtConfig::from_env()?;
            println!("{}", jwt.encode(actor_id)?);
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let options = SqliteConnectOptions::from_str(&database_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")
}

async fn get_service() -> anyhow::Result<PermissionService> {
    let pool = get_pool().await?;
    Ok(PermissionService::new(Arc::new(SqliteActorStore::new(pool))))
}

fn print_outcome(outcome: &MutationOutcome) {
    let record = outcome.record();
    let state = if outcome.is_changed() { "changed" } else { "unchanged" };
    let perms: Vec<&str> = record.permissions.iter().collect();
    println!("{} {} role={} permissions=[{}]", state, record.id, record.role, perms.join(", "));
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} Name", "Status", "Version");
    for migration in MIGRATOR.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}
