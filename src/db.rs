mod install;

use std::{fmt, path::*, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use log::*;
use sea_orm::{prelude::*, *};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{core::*, entity::*};


pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// The columns of a post joined with its author, as aliased in `PostInfo`.
const POST_INFO_COLUMNS: &str = "p.id, p.author_id, p.content, p.image, p.video, p.created_at, \
                                 p.updated_at, p.likes_count, p.comments_count, u.username AS \
                                 author_username, u.name AS author_name, u.image AS author_image";
/// Whether the user bound to the placeholder has liked post `p`.
const IS_LIKED_COLUMN: &str =
	"EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?) AS is_liked";
const COMMENT_INFO_COLUMNS: &str = "c.id, c.post_id, c.user_id, c.content, c.created_at, \
                                    c.updated_at, u.username AS author_username, u.name AS \
                                    author_name, u.image AS author_image";
const USER_PROFILE_COLUMNS: &str = "u.id, u.email, u.username, u.name, u.image, u.description AS \
                                    bio, u.location, (SELECT COUNT(*) FROM follows f WHERE \
                                    f.follower_id = u.id) AS following, u.follower_count AS \
                                    followers";


#[derive(Clone)]
pub struct Database {
	path: PathBuf,
	orm: DatabaseConnection,
}

/// A transaction on a connection checked out of the pool. Dropping it without
/// committing rolls it back and returns the connection.
pub struct Transaction(pub(crate) sea_orm::DatabaseTransaction);

#[derive(Debug, Error)]
pub enum Error {
	OrmError(sea_orm::DbErr),
	/// The version table exists, but holds no row.
	MissingVersion,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
	#[default]
	Global,
	/// Only posts of the users that the viewer follows.
	Following,
}

#[derive(Clone, Debug, FromQueryResult, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInfo {
	pub id: i64,
	pub author_id: i64,
	pub content: Option<String>,
	pub image: Option<String>,
	pub video: Option<String>,
	pub created_at: i64,
	pub updated_at: i64,
	pub likes_count: i64,
	pub comments_count: i64,
	pub author_username: String,
	pub author_name: Option<String>,
	pub author_image: Option<String>,
	/// Only known when the post was loaded on behalf of a user.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_liked: Option<bool>,
}

#[derive(Clone, Debug, FromQueryResult, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInfo {
	pub id: i64,
	pub post_id: i64,
	pub user_id: i64,
	pub content: String,
	pub created_at: i64,
	pub updated_at: i64,
	pub author_username: String,
	pub author_name: Option<String>,
	pub author_image: Option<String>,
}

#[derive(Clone, Debug, FromQueryResult, PartialEq, Serialize)]
pub struct UserProfile {
	pub id: i64,
	pub email: String,
	pub username: String,
	pub name: Option<String>,
	pub image: Option<String>,
	pub bio: Option<String>,
	pub location: Option<String>,
	/// The number of users this user follows.
	pub following: i64,
	pub followers: i64,
}

pub type Result<T> = std::result::Result<T, self::Error>;


/// The current time in milliseconds since the UNIX epoch, as stored in the
/// `created_at` and `updated_at` columns.
pub fn timestamp() -> i64 { Utc::now().timestamp_millis() }


#[async_trait]
pub trait PersistenceHandle {
	type Inner: ConnectionTrait;

	fn inner(&self) -> &Self::Inner;

	fn backend(&self) -> DatabaseBackend { self.inner().get_database_backend() }

	async fn find_user(&self, id: i64) -> Result<Option<user::Model>> {
		Ok(User::find_by_id(id).one(self.inner()).await?)
	}

	/// Finds the user that signs in with the given email address or username.
	async fn find_user_by_login(&self, login: &str) -> Result<Option<user::Model>> {
		let result = User::find()
			.filter(
				Condition::any()
					.add(user::Column::Email.eq(login))
					.add(user::Column::Username.eq(login)),
			)
			.one(self.inner())
			.await?;
		Ok(result)
	}

	/// Returns the users that already use the given email address or username.
	async fn find_users_by_email_or_username(
		&self, email: &str, username: &str,
	) -> Result<Vec<user::Model>> {
		let results = User::find()
			.filter(
				Condition::any()
					.add(user::Column::Email.eq(email))
					.add(user::Column::Username.eq(username)),
			)
			.all(self.inner())
			.await?;
		Ok(results)
	}

	async fn find_user_id_by_username(&self, username: &str) -> Result<Option<i64>> {
		let result = User::find()
			.select_only()
			.column(user::Column::Id)
			.filter(user::Column::Username.eq(username))
			.into_tuple::<i64>()
			.one(self.inner())
			.await?;
		Ok(result)
	}

	async fn find_user_profile(&self, id: i64) -> Result<Option<UserProfile>> {
		let stat = Statement::from_sql_and_values(
			self.backend(),
			format!("SELECT {} FROM users u WHERE u.id = ?", USER_PROFILE_COLUMNS),
			[id.into()],
		);
		Ok(UserProfile::find_by_statement(stat)
			.one(self.inner())
			.await?)
	}

	async fn find_user_profile_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
		let stat = Statement::from_sql_and_values(
			self.backend(),
			format!(
				"SELECT {} FROM users u WHERE u.username = ?",
				USER_PROFILE_COLUMNS
			),
			[username.into()],
		);
		Ok(UserProfile::find_by_statement(stat)
			.one(self.inner())
			.await?)
	}

	async fn find_post(&self, id: i64) -> Result<Option<post::Model>> {
		Ok(Post::find_by_id(id).one(self.inner()).await?)
	}

	/// Loads a post together with its author. `is_liked` is only filled in if a
	/// viewer is given.
	async fn find_post_info(&self, id: i64, viewer: Option<ActorId>) -> Result<Option<PostInfo>> {
		let stat = match viewer {
			Some(actor) => Statement::from_sql_and_values(
				self.backend(),
				format!(
					"SELECT {}, {} FROM posts p INNER JOIN users u ON p.author_id = u.id WHERE \
					 p.id = ?",
					POST_INFO_COLUMNS, IS_LIKED_COLUMN
				),
				[actor.0.into(), id.into()],
			),
			None => Statement::from_sql_and_values(
				self.backend(),
				format!(
					"SELECT {}, NULL AS is_liked FROM posts p INNER JOIN users u ON p.author_id \
					 = u.id WHERE p.id = ?",
					POST_INFO_COLUMNS
				),
				[id.into()],
			),
		};
		Ok(PostInfo::find_by_statement(stat).one(self.inner()).await?)
	}

	/// Loads the newest posts, either of everybody or only of the users the
	/// viewer follows.
	async fn load_feed(&self, viewer: ActorId, feed: FeedType, limit: u64) -> Result<Vec<PostInfo>> {
		let limit = limit.min(i64::MAX as u64) as i64;
		let stat = match feed {
			FeedType::Global => Statement::from_sql_and_values(
				self.backend(),
				format!(
					"SELECT {}, {} FROM posts p INNER JOIN users u ON p.author_id = u.id ORDER \
					 BY p.created_at DESC, p.id DESC LIMIT ?",
					POST_INFO_COLUMNS, IS_LIKED_COLUMN
				),
				[viewer.0.into(), limit.into()],
			),
			FeedType::Following => Statement::from_sql_and_values(
				self.backend(),
				format!(
					"SELECT {}, {} FROM posts p INNER JOIN users u ON p.author_id = u.id INNER \
					 JOIN follows f ON p.author_id = f.following_id WHERE f.follower_id = ? \
					 ORDER BY p.created_at DESC, p.id DESC LIMIT ?",
					POST_INFO_COLUMNS, IS_LIKED_COLUMN
				),
				[viewer.0.into(), viewer.0.into(), limit.into()],
			),
		};
		Ok(PostInfo::find_by_statement(stat).all(self.inner()).await?)
	}

	async fn load_user_posts(&self, viewer: ActorId, username: &str) -> Result<Vec<PostInfo>> {
		let stat = Statement::from_sql_and_values(
			self.backend(),
			format!(
				"SELECT {}, {} FROM posts p INNER JOIN users u ON p.author_id = u.id WHERE \
				 u.username = ? ORDER BY p.created_at DESC, p.id DESC",
				POST_INFO_COLUMNS, IS_LIKED_COLUMN
			),
			[viewer.0.into(), username.into()],
		);
		Ok(PostInfo::find_by_statement(stat).all(self.inner()).await?)
	}

	async fn load_comments(&self, post_id: i64) -> Result<Vec<CommentInfo>> {
		let stat = Statement::from_sql_and_values(
			self.backend(),
			format!(
				"SELECT {} FROM comments c INNER JOIN users u ON c.user_id = u.id WHERE \
				 c.post_id = ? ORDER BY c.created_at DESC, c.id DESC",
				COMMENT_INFO_COLUMNS
			),
			[post_id.into()],
		);
		Ok(CommentInfo::find_by_statement(stat)
			.all(self.inner())
			.await?)
	}

	async fn find_comment_info(&self, id: i64) -> Result<Option<CommentInfo>> {
		let stat = Statement::from_sql_and_values(
			self.backend(),
			format!(
				"SELECT {} FROM comments c INNER JOIN users u ON c.user_id = u.id WHERE c.id = ?",
				COMMENT_INFO_COLUMNS
			),
			[id.into()],
		);
		Ok(CommentInfo::find_by_statement(stat)
			.one(self.inner())
			.await?)
	}
}


impl Database {
	pub async fn load(path: PathBuf, max_connections: u32) -> Result<Self> {
		let mut opts = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
		opts.max_connections(max_connections);
		opts.idle_timeout(Duration::from_secs(10));
		opts.acquire_timeout(Duration::from_secs(5));
		opts.sqlx_logging(false);
		let orm = sea_orm::Database::connect(opts)
			.await
			.map_err(|e| self::Error::OrmError(e))?;

		let this = Self { path, orm };
		if !this.is_installed().await? {
			this.install().await?;
		}
		Ok(this)
	}

	async fn install(&self) -> Result<()> {
		info!("Installing a new database at {}.", self.path.display());
		let tx = self.transaction().await?;
		tx.inner().execute_unprepared(install::QUERY).await?;
		tx.commit().await
	}

	async fn is_installed(&self) -> Result<bool> {
		let stat = Statement::from_sql_and_values(
			self.backend(),
			"SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
			["version".into()],
		);
		Ok(self.orm.query_one(stat).await?.is_some())
	}

	pub fn path(&self) -> &Path { &self.path }

	pub async fn transaction(&self) -> Result<Transaction> {
		let tx = self.orm.begin().await?;
		Ok(Transaction(tx))
	}

	pub async fn close(self) -> Result<()> {
		self.orm.close().await?;
		Ok(())
	}

	pub async fn store_user(
		&self, email: &str, username: &str, password_hash: &str, name: Option<&str>,
	) -> Result<user::Model> {
		let now = timestamp();
		let record = user::ActiveModel {
			id: NotSet,
			email: Set(email.to_string()),
			username: Set(username.to_string()),
			password: Set(password_hash.to_string()),
			name: Set(name.map(|n| n.to_string())),
			description: Set(None),
			image: Set(None),
			location: Set(None),
			follower_count: Set(0),
			created_at: Set(now),
			updated_at: Set(now),
		};
		Ok(record.insert(&self.orm).await?)
	}

	pub async fn store_post(
		&self, author_id: i64, content: Option<String>, image: Option<String>,
		video: Option<String>,
	) -> Result<i64> {
		let now = timestamp();
		let record = post::ActiveModel {
			id: NotSet,
			author_id: Set(author_id),
			content: Set(content),
			image: Set(image),
			video: Set(video),
			created_at: Set(now),
			updated_at: Set(now),
			likes_count: Set(0),
			comments_count: Set(0),
		};
		let result = Post::insert(record).exec(&self.orm).await?;
		Ok(result.last_insert_id)
	}

	/// Deletes a post of the given author, together with its likes and
	/// comments. Returns false if the author has no such post.
	pub async fn delete_post(&self, author_id: i64, post_id: i64) -> Result<bool> {
		let owned_post = Post::find()
			.select_only()
			.column(post::Column::Id)
			.filter(post::Column::Id.eq(post_id))
			.filter(post::Column::AuthorId.eq(author_id))
			.into_query();

		// Every statement is a write, so that the write lock is taken right away.
		let tx = self.transaction().await?;
		Like::delete_many()
			.filter(like::Column::PostId.in_subquery(owned_post.clone()))
			.exec(tx.inner())
			.await?;
		Comment::delete_many()
			.filter(comment::Column::PostId.in_subquery(owned_post))
			.exec(tx.inner())
			.await?;
		let result = Post::delete_many()
			.filter(post::Column::Id.eq(post_id))
			.filter(post::Column::AuthorId.eq(author_id))
			.exec(tx.inner())
			.await?;

		if result.rows_affected == 0 {
			tx.rollback().await?;
			return Ok(false);
		}
		tx.commit().await?;
		Ok(true)
	}

	/// Stores a comment and bumps the comment counter of its post. Returns
	/// `None` if the post doesn't exist.
	pub async fn store_comment(
		&self, post_id: i64, user_id: i64, content: &str,
	) -> Result<Option<i64>> {
		let tx = self.transaction().await?;
		let result = Post::update_many()
			.col_expr(
				post::Column::CommentsCount,
				Expr::col(post::Column::CommentsCount).add(1),
			)
			.filter(post::Column::Id.eq(post_id))
			.exec(tx.inner())
			.await?;
		if result.rows_affected == 0 {
			tx.rollback().await?;
			return Ok(None);
		}

		let now = timestamp();
		let record = comment::ActiveModel {
			id: NotSet,
			post_id: Set(post_id),
			user_id: Set(user_id),
			content: Set(content.to_string()),
			created_at: Set(now),
			updated_at: Set(now),
		};
		let inserted = Comment::insert(record).exec(tx.inner()).await?;
		tx.commit().await?;
		Ok(Some(inserted.last_insert_id))
	}
}

impl PersistenceHandle for Database {
	type Inner = sea_orm::DatabaseConnection;

	fn inner(&self) -> &Self::Inner { &self.orm }
}

impl PersistenceHandle for Transaction {
	type Inner = sea_orm::DatabaseTransaction;

	fn inner(&self) -> &Self::Inner { &self.0 }
}

impl Transaction {
	pub async fn commit(self) -> Result<()> {
		self.0.commit().await?;
		Ok(())
	}

	pub async fn rollback(self) -> Result<()> {
		self.0.rollback().await?;
		Ok(())
	}
}

impl Error {
	/// Whether a unique index refused the write.
	pub fn is_unique_violation(&self) -> bool {
		match self {
			Self::OrmError(e) => matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
			_ => false,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::OrmError(e) => write!(f, "{}", e),
			Self::MissingVersion => write!(f, "no version found in the database"),
		}
	}
}

impl From<sea_orm::DbErr> for Error {
	fn from(other: sea_orm::DbErr) -> Self { Self::OrmError(other) }
}
