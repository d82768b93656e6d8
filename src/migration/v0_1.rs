use async_trait::async_trait;
use sea_orm::ConnectionTrait;

use super::MigrationTrait;
use crate::db::{self, PersistenceHandle};


/// Introduces the denormalized follower counter on users, so that toggling a
/// follow no longer needs to count the follows table.
pub struct Migration;


#[async_trait]
impl MigrationTrait for Migration {
	async fn run(&self, tx: &db::Transaction) -> db::Result<()> {
		tx.inner()
			.execute_unprepared(
				r#"
			ALTER TABLE users ADD COLUMN follower_count INTEGER NOT NULL DEFAULT 0;
			UPDATE users SET follower_count = (
				SELECT COUNT(*) FROM follows WHERE follows.following_id = users.id
			);
		"#,
			)
			.await?;
		Ok(())
	}
}
