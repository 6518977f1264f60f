use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use orgtask::authz::Role;
use orgtask::db;
use orgtask::models::organization::Organization;
use orgtask::models::task::{Task, TaskCategory, TaskPriority, TaskStatus};
use orgtask::models::user::User;
use orgtask::utils::hash_password;

#[derive(Parser, Debug)]
#[command(author, version, about = "orgtask operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create a demo organization tree with one user per role and a few tasks
    SeedDemo {
        /// Password given to every demo user
        #[arg(long, default_value = "password123")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::SeedDemo { password } => {
            let pool = get_pool().await?;
            get_migrator().await?.run(&pool).await?;
            seed_demo(&pool, &password).await?;
        }
    }

    Ok(())
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let filename = format!("{}_{}.sql", timestamp, sanitized);
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let has_table = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;
    let applied_versions: HashSet<i64> = if has_table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let applied = applied_versions.contains(&migration.version);
        let status = if applied { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // ./migrations when run from the repo root, else the crate-local folder
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}

/// Acme (owner, admin, viewer) with a child Acme Labs (admin).
async fn seed_demo(pool: &SqlitePool, password: &str) -> anyhow::Result<()> {
    if db::users::email_exists(pool, "owner@acme.test").await? {
        println!("Demo data already present");
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let acme = organization("Acme", None);
    let labs = organization("Acme Labs", Some(acme.id));
    db::organizations::insert(&mut *tx, &acme).await?;
    db::organizations::insert(&mut *tx, &labs).await?;

    let users = [
        user("owner@acme.test", "Olivia", Role::Owner, acme.id),
        user("admin@acme.test", "Adam", Role::Admin, acme.id),
        user("viewer@acme.test", "Vera", Role::Viewer, acme.id),
        user("admin@labs.acme.test", "Lena", Role::Admin, labs.id),
    ];
    for u in &users {
        db::users::insert(&mut *tx, u, &password_hash).await?;
    }

    let owner = &users[0];
    let demo_tasks = [
        ("Plan Q3 roadmap", TaskStatus::Todo, TaskCategory::Work, TaskPriority::High, acme.id),
        ("Review hiring pipeline", TaskStatus::Todo, TaskCategory::Work, TaskPriority::Medium, acme.id),
        ("Migrate billing service", TaskStatus::InProgress, TaskCategory::Urgent, TaskPriority::High, acme.id),
        ("Publish release notes", TaskStatus::Done, TaskCategory::Work, TaskPriority::Low, acme.id),
        ("Prototype search ranking", TaskStatus::Todo, TaskCategory::Other, TaskPriority::Medium, labs.id),
    ];
    for (title, status, category, priority, organization_id) in demo_tasks {
        let task = Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            status,
            category,
            priority,
            order: 0,
            due_date: None,
            organization_id,
            created_by: Some(owner.id),
            created_at: now,
            updated_at: now,
        };
        db::tasks::insert(&mut *tx, &task).await?;
    }

    tx.commit().await?;

    println!("Seeded demo data (password: {password})");
    for u in &users {
        println!("  {:<24} {}", u.email, u.role);
    }
    Ok(())
}

fn organization(name: &str, parent_id: Option<Uuid>) -> Organization {
    let now = Utc::now();
    Organization {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        parent_id,
        created_at: now,
        updated_at: now,
    }
}

fn user(email: &str, first_name: &str, role: Role, organization_id: Uuid) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: "Demo".to_string(),
        role,
        organization_id,
        created_at: now,
        updated_at: now,
    }
}
