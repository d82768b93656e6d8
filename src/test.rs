use std::sync::Arc;

use log::*;
use sea_orm::{prelude::*, Set};
use tempfile::NamedTempFile;

use crate::{
	api::Api,
	config::Config,
	db::{self, Database, PersistenceHandle},
	entity::*,
	migration::Migrations,
	web::Global,
};


pub const TEST_SECRET: &str = "test-secret";


pub async fn load_database(filename: &str) -> Database {
	let temp_file = NamedTempFile::with_prefix(filename).unwrap();
	let db = Database::load(temp_file.path().to_owned(), db::DEFAULT_MAX_CONNECTIONS)
		.await
		.expect("unable to load database");
	let migrations = Migrations::load();
	migrations.run(&db).await.expect("migration issue");
	debug!("Loaded database at {}", temp_file.path().display());
	// Leak it on purpose so that the temp file may live until the end of all tests
	Box::into_raw(Box::new(temp_file));
	db
}

pub fn test_config() -> Config {
	Config {
		jwt_secret: TEST_SECRET.to_string(),
		..Config::default()
	}
}

pub async fn load_api(filename: &str) -> Api {
	let db = load_database(filename).await;
	Api::new(db, &test_config())
}

/// Sets up the state the HTTP routes run on.
pub async fn load_global(filename: &str) -> Arc<Global> {
	let api = load_api(filename).await;
	Arc::new(Global::new(test_config(), api))
}

/// Stores a user with a fixed id. Its password hash is not a valid hash, so it
/// can't sign in.
pub async fn create_user(db: &Database, id: i64, username: &str) -> user::Model {
	let now = db::timestamp();
	let record = user::ActiveModel {
		id: Set(id),
		email: Set(format!("{}@example.com", username)),
		username: Set(username.to_string()),
		password: Set("!".to_string()),
		name: Set(None),
		description: Set(None),
		image: Set(None),
		location: Set(None),
		follower_count: Set(0),
		created_at: Set(now),
		updated_at: Set(now),
	};
	record.insert(db.inner()).await.expect("unable to store user")
}

pub async fn create_post(db: &Database, id: i64, author_id: i64) -> post::Model {
	let now = db::timestamp();
	let record = post::ActiveModel {
		id: Set(id),
		author_id: Set(author_id),
		content: Set(Some(format!("Post {}", id))),
		image: Set(None),
		video: Set(None),
		created_at: Set(now),
		updated_at: Set(now),
		likes_count: Set(0),
		comments_count: Set(0),
	};
	record.insert(db.inner()).await.expect("unable to store post")
}

/// Stores a like row without touching the counter of the post.
pub async fn create_like(db: &Database, user_id: i64, post_id: i64) {
	let record = like::ActiveModel {
		user_id: Set(user_id),
		post_id: Set(post_id),
		created_at: Set(db::timestamp()),
		..Default::default()
	};
	Like::insert(record)
		.exec(db.inner())
		.await
		.expect("unable to store like");
}

/// Stores a follow row and bumps the follower count, like a toggle would.
pub async fn create_follow(db: &Database, follower_id: i64, following_id: i64) {
	let record = follow::ActiveModel {
		follower_id: Set(follower_id),
		following_id: Set(following_id),
		created_at: Set(db::timestamp()),
		..Default::default()
	};
	Follow::insert(record)
		.exec(db.inner())
		.await
		.expect("unable to store follow");
	User::update_many()
		.col_expr(
			user::Column::FollowerCount,
			Expr::col(user::Column::FollowerCount).add(1),
		)
		.filter(user::Column::Id.eq(following_id))
		.exec(db.inner())
		.await
		.expect("unable to update follower count");
}

pub async fn set_likes_count(db: &Database, post_id: i64, count: i64) {
	Post::update_many()
		.col_expr(post::Column::LikesCount, Expr::val(count).into())
		.filter(post::Column::Id.eq(post_id))
		.exec(db.inner())
		.await
		.expect("unable to set likes count");
}
