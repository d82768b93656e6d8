//! The module for migrating the database.
use std::fmt::Display;

use async_trait::async_trait;
use log::info;
use sea_orm::{prelude::*, sea_query::*, ConnectionTrait};

use crate::db::{self, Database, PersistenceHandle};

mod v0_1;


/// The latest database version.
pub const LATEST_VERSION: Version = Version { major: 0, minor: 1 };


#[derive(Clone, Debug)]
pub struct Version {
	major: u32,
	minor: u32,
}

pub struct Migrations {
	/// A list of available migrations, ordered at version
	list: Vec<(Version, Box<dyn MigrationTrait + Send + Sync>)>,
}

#[async_trait]
trait MigrationTrait {
	async fn run(&self, tx: &db::Transaction) -> db::Result<()>;
}


impl Migrations {
	pub fn load() -> Self {
		Self {
			list: vec![(
				Version::new(0, 1),
				Box::new(v0_1::Migration) as Box<dyn MigrationTrait + Send + Sync>,
			)],
		}
	}

	pub async fn load_version(&self, handle: &impl PersistenceHandle) -> db::Result<Version> {
		let q = Query::select()
			.from(Alias::new("version"))
			.column(Alias::new("major"))
			.column(Alias::new("minor"))
			.to_owned();
		let r = handle.inner().query_one(handle.backend().build(&q)).await?;
		let result = r.ok_or(db::Error::MissingVersion)?;
		let major: u32 = result.try_get_by_index(0)?;
		let minor: u32 = result.try_get_by_index(1)?;
		Ok(Version::new(major, minor))
	}

	async fn store_version(&self, tx: &db::Transaction, version: &Version) -> db::Result<()> {
		let q = Query::update()
			.table(Alias::new("version"))
			.values([
				(Alias::new("major"), version.major.into()),
				(Alias::new("minor"), version.minor.into()),
			])
			.to_owned();
		let _ = tx.inner().execute(tx.backend().build(&q)).await?;
		Ok(())
	}

	/// Brings the database up to `LATEST_VERSION`. Does nothing if it already
	/// is.
	pub async fn run(&self, db: &Database) -> db::Result<()> {
		let mut current_version = self.load_version(db).await?;

		for (new_version, migration) in &self.list {
			if new_version > &current_version {
				let tx = db.transaction().await?;
				info!(
					"Running database migration from {} to {}...",
					current_version, new_version
				);
				migration.run(&tx).await?;
				self.store_version(&tx, new_version).await?;
				tx.commit().await?;
				info!("Migrated database to {}.", new_version);
				current_version = new_version.clone();
			}
		}

		assert_eq!(
			current_version, LATEST_VERSION,
			"not migrated to latest version"
		);
		Ok(())
	}
}

impl Version {
	pub fn new(major: u32, minor: u32) -> Self { Self { major, minor } }
}

impl Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "v{}.{}", self.major, self.minor)
	}
}

impl PartialEq for Version {
	fn eq(&self, other: &Self) -> bool { self.major == other.major && self.minor == other.minor }
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		match self.major.partial_cmp(&other.major) {
			Some(std::cmp::Ordering::Equal) => {}
			ord => return ord,
		}
		self.minor.partial_cmp(&other.minor)
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::test;

	#[tokio::test]
	async fn test_migrated_to_latest() {
		let db = test::load_database("migration").await;
		let migrations = Migrations::load();
		assert_eq!(migrations.load_version(&db).await.unwrap(), LATEST_VERSION);

		// Running them again is a no-op
		migrations.run(&db).await.unwrap();
		assert_eq!(migrations.load_version(&db).await.unwrap(), LATEST_VERSION);
	}
}
