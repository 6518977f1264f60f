use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub mod audit;
pub mod organizations;
pub mod tasks;
pub mod users;

pub async fn init() -> anyhow::Result<SqlitePool> {
	let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

	let pool = SqlitePoolOptions::new()
		.max_connections(10)
		.min_connections(1)
		.acquire_timeout(Duration::from_secs(10))
		.connect(&database_url)
		.await
		.context("failed to connect to database")?;

	migrate(&pool).await?;

	Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
	sqlx::migrate!()
		.run(pool)
		.await
		.context("failed to run migrations")
}

#[cfg(test)]
pub(crate) mod test_support {
	use chrono::Utc;
	use sqlx::sqlite::SqlitePoolOptions;
	use sqlx::SqlitePool;
	use uuid::Uuid;

	/// Single-connection in-memory database with migrations applied.
	pub async fn memory_pool() -> anyhow::Result<SqlitePool> {
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect("sqlite::memory:")
			.await?;
		super::migrate(&pool).await?;
		Ok(pool)
	}

	pub async fn seed_org(pool: &SqlitePool, name: &str, parent_id: Option<Uuid>) -> anyhow::Result<Uuid> {
		let id = Uuid::new_v4();
		let now = Utc::now();
		sqlx::query(
			"INSERT INTO organizations (id, name, description, parent_id, created_at, updated_at) VALUES (?, ?, NULL, ?, ?, ?)",
		)
		.bind(id)
		.bind(name)
		.bind(parent_id)
		.bind(now)
		.bind(now)
		.execute(pool)
		.await?;
		Ok(id)
	}
}
