//! Relations between a user and a post or another user, like likes and follows.
//!
//! A relation is a row in its relation table, and its target carries a
//! denormalized counter of the relation rows pointing at it. The counter is
//! only ever adjusted by update statements that increment or decrement it in
//! place, inside the same transaction that inserts or deletes the row, so the
//! two can't drift apart.

use std::fmt;

use log::*;
use sea_orm::{sea_query::*, ConnectionTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
	core::*,
	db::{self, Database, PersistenceHandle},
};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationKind {
	/// A user likes a post.
	Like,
	/// A user follows another user.
	Follow,
}

/// Where a relation kind keeps its rows and its counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationSchema {
	pub table: &'static str,
	pub actor_column: &'static str,
	pub target_column: &'static str,
	pub target_table: &'static str,
	pub target_id_column: &'static str,
	pub counter_column: &'static str,
	pub created_column: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToggleResult {
	/// Whether the relation exists after the toggle.
	pub active: bool,
	/// The counter of the target after the toggle.
	pub counter: i64,
}

#[derive(Clone)]
pub struct RelationService {
	db: Database,
}

#[derive(Debug, Error)]
pub enum Error {
	/// The relation kind doesn't allow an actor to relate to itself.
	SelfRelation(RelationKind),
	TargetNotFound(RelationKind, TargetId),
	Database(db::Error),
}

pub type Result<T> = std::result::Result<T, self::Error>;


const LIKE_SCHEMA: RelationSchema = RelationSchema {
	table: "likes",
	actor_column: "user_id",
	target_column: "post_id",
	target_table: "posts",
	target_id_column: "id",
	counter_column: "likes_count",
	created_column: "created_at",
};

const FOLLOW_SCHEMA: RelationSchema = RelationSchema {
	table: "follows",
	actor_column: "follower_id",
	target_column: "following_id",
	target_table: "users",
	target_id_column: "id",
	counter_column: "follower_count",
	created_column: "created_at",
};


impl RelationKind {
	pub fn schema(&self) -> &'static RelationSchema {
		match self {
			Self::Like => &LIKE_SCHEMA,
			Self::Follow => &FOLLOW_SCHEMA,
		}
	}

	/// Users may like their own posts, but can't follow themselves.
	pub fn allows_self_relation(&self) -> bool {
		match self {
			Self::Like => true,
			Self::Follow => false,
		}
	}
}

impl fmt::Display for RelationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Like => write!(f, "like"),
			Self::Follow => write!(f, "follow"),
		}
	}
}

impl RelationSchema {
	fn relation_condition(&self, actor: ActorId, target: TargetId) -> Condition {
		Condition::all()
			.add(Expr::col(Alias::new(self.actor_column)).eq(actor.0))
			.add(Expr::col(Alias::new(self.target_column)).eq(target.0))
	}

	fn delete_relation(&self, actor: ActorId, target: TargetId) -> DeleteStatement {
		Query::delete()
			.from_table(Alias::new(self.table))
			.cond_where(self.relation_condition(actor, target))
			.to_owned()
	}

	fn insert_relation(&self, actor: ActorId, target: TargetId, created: i64) -> InsertStatement {
		Query::insert()
			.into_table(Alias::new(self.table))
			.columns([
				Alias::new(self.actor_column),
				Alias::new(self.target_column),
				Alias::new(self.created_column),
			])
			.values_panic([actor.0.into(), target.0.into(), created.into()])
			.to_owned()
	}

	fn select_relation(&self, actor: ActorId, target: TargetId) -> SelectStatement {
		Query::select()
			.expr(Expr::val(1))
			.from(Alias::new(self.table))
			.cond_where(self.relation_condition(actor, target))
			.to_owned()
	}

	fn count_relations(&self, target: TargetId) -> SelectStatement {
		Query::select()
			.expr(Func::count(Expr::col(Asterisk)))
			.from(Alias::new(self.table))
			.and_where(Expr::col(Alias::new(self.target_column)).eq(target.0))
			.to_owned()
	}

	fn select_counter(&self, target: TargetId) -> SelectStatement {
		Query::select()
			.column(Alias::new(self.counter_column))
			.from(Alias::new(self.target_table))
			.and_where(Expr::col(Alias::new(self.target_id_column)).eq(target.0))
			.to_owned()
	}

	fn increment_counter(&self, target: TargetId) -> UpdateStatement {
		let counter = Alias::new(self.counter_column);
		Query::update()
			.table(Alias::new(self.target_table))
			.value(counter.clone(), Expr::col(counter).add(1))
			.and_where(Expr::col(Alias::new(self.target_id_column)).eq(target.0))
			.to_owned()
	}

	/// Decrements the counter, but never below zero. A counter that is already
	/// zero is left alone.
	fn decrement_counter(&self, target: TargetId) -> UpdateStatement {
		let counter = Alias::new(self.counter_column);
		Query::update()
			.table(Alias::new(self.target_table))
			.value(counter.clone(), Expr::col(counter.clone()).sub(1))
			.and_where(Expr::col(Alias::new(self.target_id_column)).eq(target.0))
			.and_where(Expr::col(counter).gt(0))
			.to_owned()
	}
}

impl RelationService {
	pub fn new(db: Database) -> Self { Self { db } }

	/// Creates the relation if it doesn't exist, removes it if it does, and
	/// adjusts the counter of the target accordingly. All of it happens in one
	/// transaction, which is rolled back on any error.
	pub async fn toggle(
		&self, actor: ActorId, target: TargetId, kind: RelationKind,
	) -> Result<ToggleResult> {
		if !kind.allows_self_relation() && actor.as_target() == target {
			return Err(Error::SelfRelation(kind));
		}

		let tx = self.db.transaction().await?;
		match Self::apply_toggle(&tx, actor, target, kind).await {
			Ok(result) => {
				tx.commit().await?;
				debug!(
					"Toggled {} of {} on {}: active={}, counter={}",
					kind, actor, target, result.active, result.counter
				);
				Ok(result)
			}
			Err(e) => {
				if let Err(e2) = tx.rollback().await {
					warn!("Unable to roll back {} toggle: {}", kind, e2);
				}
				Err(e)
			}
		}
	}

	async fn apply_toggle(
		tx: &db::Transaction, actor: ActorId, target: TargetId, kind: RelationKind,
	) -> Result<ToggleResult> {
		let schema = kind.schema();

		// The first statement has to be a write, so that this transaction holds
		// the write lock before it looks at anything. Competing toggles on the
		// same relation then wait for us, instead of acting on a stale read.
		let deleted = tx
			.inner()
			.execute(tx.backend().build(&schema.delete_relation(actor, target)))
			.await
			.map_err(db::Error::from)?
			.rows_affected();

		if Self::load_counter(tx, schema, target).await?.is_none() {
			return Err(Error::TargetNotFound(kind, target));
		}

		let active = if deleted > 0 {
			tx.inner()
				.execute(tx.backend().build(&schema.decrement_counter(target)))
				.await
				.map_err(db::Error::from)?;
			false
		} else {
			tx.inner()
				.execute(
					tx.backend()
						.build(&schema.insert_relation(actor, target, db::timestamp())),
				)
				.await
				.map_err(db::Error::from)?;
			tx.inner()
				.execute(tx.backend().build(&schema.increment_counter(target)))
				.await
				.map_err(db::Error::from)?;
			true
		};

		let counter = Self::load_counter(tx, schema, target)
			.await?
			.ok_or(Error::TargetNotFound(kind, target))?;
		Ok(ToggleResult { active, counter })
	}

	async fn load_counter(
		handle: &impl PersistenceHandle, schema: &RelationSchema, target: TargetId,
	) -> Result<Option<i64>> {
		let result = handle
			.inner()
			.query_one(handle.backend().build(&schema.select_counter(target)))
			.await
			.map_err(db::Error::from)?;
		match result {
			None => Ok(None),
			Some(row) => Ok(Some(row.try_get_by_index(0).map_err(db::Error::from)?)),
		}
	}

	/// Whether the actor currently has the relation with the target.
	pub async fn is_active(
		&self, actor: ActorId, target: TargetId, kind: RelationKind,
	) -> Result<bool> {
		let stat = self
			.db
			.backend()
			.build(&kind.schema().select_relation(actor, target));
		let result = self
			.db
			.inner()
			.query_one(stat)
			.await
			.map_err(db::Error::from)?;
		Ok(result.is_some())
	}

	/// The counter of the target, or `None` if the target doesn't exist.
	pub async fn counter(&self, target: TargetId, kind: RelationKind) -> Result<Option<i64>> {
		Self::load_counter(&self.db, kind.schema(), target).await
	}

	/// Counts the relation rows pointing at the target, which is what its
	/// counter is supposed to be equal to.
	pub async fn count_relations(&self, target: TargetId, kind: RelationKind) -> Result<u64> {
		let stat = self
			.db
			.backend()
			.build(&kind.schema().count_relations(target));
		let result = self
			.db
			.inner()
			.query_one(stat)
			.await
			.map_err(db::Error::from)?;
		let count: i64 = match result {
			Some(row) => row.try_get_by_index(0).map_err(db::Error::from)?,
			None => 0,
		};
		Ok(count as u64)
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::SelfRelation(kind) => write!(f, "can't {} yourself", kind),
			Self::TargetNotFound(kind, target) => {
				write!(f, "target {} of {} not found", target, kind)
			}
			Self::Database(e) => write!(f, "database error: {}", e),
		}
	}
}

impl From<db::Error> for Error {
	fn from(other: db::Error) -> Self { Self::Database(other) }
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::test;

	async fn assert_consistent(service: &RelationService, target: TargetId, kind: RelationKind) {
		let counter = service.counter(target, kind).await.unwrap().unwrap();
		let rows = service.count_relations(target, kind).await.unwrap();
		assert_eq!(counter, rows as i64, "counter drifted from the relation rows");
	}

	#[tokio::test]
	async fn test_toggle_like_twice() {
		let db = test::load_database("relation-like").await;
		test::create_user(&db, 5, "rex").await;
		test::create_post(&db, 42, 5).await;
		let service = RelationService::new(db);

		let first = service
			.toggle(ActorId(5), TargetId(42), RelationKind::Like)
			.await
			.unwrap();
		assert_eq!(
			first,
			ToggleResult {
				active: true,
				counter: 1
			}
		);
		assert!(service
			.is_active(ActorId(5), TargetId(42), RelationKind::Like)
			.await
			.unwrap());
		assert_consistent(&service, TargetId(42), RelationKind::Like).await;

		let second = service
			.toggle(ActorId(5), TargetId(42), RelationKind::Like)
			.await
			.unwrap();
		assert_eq!(
			second,
			ToggleResult {
				active: false,
				counter: 0
			}
		);
		assert!(!service
			.is_active(ActorId(5), TargetId(42), RelationKind::Like)
			.await
			.unwrap());
		assert_consistent(&service, TargetId(42), RelationKind::Like).await;
	}

	#[tokio::test]
	async fn test_counter_follows_many_actors() {
		let db = test::load_database("relation-many").await;
		for id in 1..=4 {
			test::create_user(&db, id, &format!("pet{}", id)).await;
		}
		test::create_post(&db, 7, 1).await;
		let service = RelationService::new(db);

		for (actor, expected) in [(1, 1), (2, 2), (3, 3), (2, 2), (4, 3), (1, 2)] {
			let result = service
				.toggle(ActorId(actor), TargetId(7), RelationKind::Like)
				.await
				.unwrap();
			assert_eq!(result.counter, expected);
			assert_consistent(&service, TargetId(7), RelationKind::Like).await;
		}
	}

	#[tokio::test]
	async fn test_counter_never_negative() {
		let db = test::load_database("relation-clamp").await;
		test::create_user(&db, 1, "rex").await;
		test::create_post(&db, 3, 1).await;
		test::create_like(&db, 1, 3).await;
		// The like row exists, but the counter says otherwise
		test::set_likes_count(&db, 3, 0).await;

		let service = RelationService::new(db);
		let result = service
			.toggle(ActorId(1), TargetId(3), RelationKind::Like)
			.await
			.unwrap();
		assert_eq!(
			result,
			ToggleResult {
				active: false,
				counter: 0
			}
		);
	}

	#[tokio::test]
	async fn test_like_own_post() {
		let db = test::load_database("relation-own-post").await;
		test::create_user(&db, 9, "polly").await;
		test::create_post(&db, 9, 9).await;
		let service = RelationService::new(db);

		let result = service
			.toggle(ActorId(9), TargetId(9), RelationKind::Like)
			.await
			.unwrap();
		assert!(result.active);
	}

	#[tokio::test]
	async fn test_self_follow_rejected() {
		let db = test::load_database("relation-self-follow").await;
		test::create_user(&db, 1, "rex").await;
		let service = RelationService::new(db);

		let result = service
			.toggle(ActorId(1), TargetId(1), RelationKind::Follow)
			.await;
		assert!(matches!(
			result,
			Err(Error::SelfRelation(RelationKind::Follow))
		));
		assert_eq!(
			service
				.count_relations(TargetId(1), RelationKind::Follow)
				.await
				.unwrap(),
			0
		);
		assert_consistent(&service, TargetId(1), RelationKind::Follow).await;
	}

	#[tokio::test]
	async fn test_follow_updates_follower_count() {
		let db = test::load_database("relation-follow").await;
		test::create_user(&db, 1, "rex").await;
		test::create_user(&db, 2, "whiskers").await;
		let service = RelationService::new(db);

		let result = service
			.toggle(ActorId(1), TargetId(2), RelationKind::Follow)
			.await
			.unwrap();
		assert_eq!(
			result,
			ToggleResult {
				active: true,
				counter: 1
			}
		);
		// Following is directed
		assert_eq!(
			service
				.counter(TargetId(1), RelationKind::Follow)
				.await
				.unwrap(),
			Some(0)
		);
		assert_consistent(&service, TargetId(2), RelationKind::Follow).await;
	}

	#[tokio::test]
	async fn test_missing_target() {
		let db = test::load_database("relation-missing").await;
		test::create_user(&db, 1, "rex").await;
		let service = RelationService::new(db);

		let result = service
			.toggle(ActorId(1), TargetId(404), RelationKind::Like)
			.await;
		assert!(matches!(
			result,
			Err(Error::TargetNotFound(RelationKind::Like, TargetId(404)))
		));
		assert_eq!(
			service
				.count_relations(TargetId(404), RelationKind::Like)
				.await
				.unwrap(),
			0
		);
		assert_eq!(
			service
				.counter(TargetId(404), RelationKind::Like)
				.await
				.unwrap(),
			None
		);
	}
}
