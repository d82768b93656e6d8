use std::{borrow::Cow, fmt};

use log::*;
use serde::Serialize;
use thiserror::Error;

use crate::{
	auth::{self, AuthVerifier, JwtAuth},
	config::Config,
	core::*,
	db::{self, *},
	entity::user,
	relation::{self, RelationKind, RelationService},
};


/// Everything the HTTP layer can ask of the backend.
#[derive(Clone)]
pub struct Api {
	pub db: Database,
	pub relations: RelationService,
	pub tokens: JwtAuth,
	feed_limit: u64,
}

/// The fields of a user that are returned on sign up and sign in.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccountInfo {
	pub id: i64,
	pub name: Option<String>,
	pub email: String,
	pub username: String,
	pub image: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatus {
	pub following: bool,
	pub follower_count: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
	pub liked: bool,
	pub likes_count: i64,
}

#[derive(Debug, Error)]
pub enum Error {
	Unauthorized(Cow<'static, str>),
	InvalidInput(Cow<'static, str>),
	NotFound(Cow<'static, str>),
	InvalidOperation(Cow<'static, str>),
	Database(db::Error),
	Auth(auth::Error),
}

pub type Result<T> = std::result::Result<T, self::Error>;


impl Api {
	pub fn new(db: Database, config: &Config) -> Self {
		Self {
			relations: RelationService::new(db.clone()),
			tokens: JwtAuth::new(&config.jwt_secret, config.token_expiry_secs()),
			feed_limit: config.feed_limit(),
			db,
		}
	}

	pub async fn close(self) {
		if let Err(e) = self.db.close().await {
			error!("Unable to close database: {}", e);
		}
	}

	pub async fn sign_up(
		&self, email: &str, username: &str, password: &str, name: Option<&str>,
	) -> Result<AccountInfo> {
		let email = email.trim();
		let username = username.trim();
		if email.is_empty() || username.is_empty() || password.is_empty() {
			return Err(Error::InvalidInput(
				"Email, username and password are required".into(),
			));
		}

		let existing = self
			.db
			.find_users_by_email_or_username(email, username)
			.await?;
		if existing.iter().any(|u| u.email == email) {
			return Err(Error::InvalidInput("Email already in use".into()));
		}
		if existing.iter().any(|u| u.username == username) {
			return Err(Error::InvalidInput("Username already taken".into()));
		}

		let hash = auth::hash_password(password)?;
		let name = name.map(str::trim).filter(|n| !n.is_empty());
		let user = match self.db.store_user(email, username, &hash, name).await {
			Ok(u) => u,
			// Somebody else signed up with the same details in the meantime
			Err(e) if e.is_unique_violation() =>
				return Err(Error::InvalidInput(
					"Email or username already taken".into(),
				)),
			Err(e) => return Err(e.into()),
		};
		info!("Signed up user {} ({}).", user.username, user.id);
		Ok(user.into())
	}

	/// Signs in with either an email address or a username. Returns a bearer
	/// token for the user.
	pub async fn sign_in(&self, login: &str, password: &str) -> Result<(String, AccountInfo)> {
		let user = match self.db.find_user_by_login(login.trim()).await? {
			Some(u) => u,
			None => return Err(Error::Unauthorized("Invalid credentials".into())),
		};
		if !auth::verify_password(password, &user.password) {
			return Err(Error::Unauthorized("Invalid credentials".into()));
		}

		let token = self.tokens.issue(user.id, &user.email)?;
		Ok((token, user.into()))
	}

	pub async fn load_me(&self, actor: ActorId) -> Result<UserProfile> {
		self.db
			.find_user_profile(actor.0)
			.await?
			.ok_or(Error::NotFound("User not found".into()))
	}

	pub async fn load_profile(&self, username: &str) -> Result<UserProfile> {
		self.db
			.find_user_profile_by_username(username)
			.await?
			.ok_or(Error::NotFound("User not found".into()))
	}

	/// The posts of a user, newest first. An unknown user simply has none.
	pub async fn load_user_posts(&self, actor: ActorId, username: &str) -> Result<Vec<PostInfo>> {
		Ok(self.db.load_user_posts(actor, username).await?)
	}

	async fn resolve_username(&self, username: &str) -> Result<TargetId> {
		match self.db.find_user_id_by_username(username).await? {
			Some(id) => Ok(TargetId(id)),
			None => Err(Error::NotFound("User not found".into())),
		}
	}

	pub async fn follow_status(&self, actor: ActorId, username: &str) -> Result<FollowStatus> {
		let target = self.resolve_username(username).await?;
		let following = self
			.relations
			.is_active(actor, target, RelationKind::Follow)
			.await?;
		let follower_count = self
			.relations
			.counter(target, RelationKind::Follow)
			.await?
			.ok_or(Error::NotFound("User not found".into()))?;
		Ok(FollowStatus {
			following,
			follower_count,
		})
	}

	pub async fn toggle_follow(&self, actor: ActorId, username: &str) -> Result<FollowStatus> {
		let target = self.resolve_username(username).await?;
		let result = self
			.relations
			.toggle(actor, target, RelationKind::Follow)
			.await?;
		Ok(FollowStatus {
			following: result.active,
			follower_count: result.counter,
		})
	}

	pub async fn load_feed(&self, actor: ActorId, feed: FeedType) -> Result<Vec<PostInfo>> {
		Ok(self.db.load_feed(actor, feed, self.feed_limit).await?)
	}

	/// Creates a post. Blank fields are left out, and at least one of them has
	/// to remain.
	pub async fn create_post(
		&self, actor: ActorId, content: Option<String>, image: Option<String>,
		video: Option<String>,
	) -> Result<PostInfo> {
		fn non_blank(field: Option<String>) -> Option<String> {
			field.filter(|s| !s.trim().is_empty())
		}
		let content = non_blank(content);
		let image = non_blank(image);
		let video = non_blank(video);
		if content.is_none() && image.is_none() && video.is_none() {
			return Err(Error::InvalidInput(
				"Post must have content, image, or video".into(),
			));
		}

		let id = self.db.store_post(actor.0, content, image, video).await?;
		debug!("User {} created post {}.", actor, id);
		self.db
			.find_post_info(id, Some(actor))
			.await?
			.ok_or(Error::NotFound("Post not found".into()))
	}

	pub async fn find_post(&self, id: TargetId) -> Result<PostInfo> {
		self.db
			.find_post_info(id.0, None)
			.await?
			.ok_or(Error::NotFound("Post not found".into()))
	}

	pub async fn delete_post(&self, actor: ActorId, id: TargetId) -> Result<()> {
		if !self.db.delete_post(actor.0, id.0).await? {
			return Err(Error::NotFound(
				"Post not found or you do not have permission to delete it".into(),
			));
		}
		debug!("User {} deleted post {}.", actor, id);
		Ok(())
	}

	pub async fn toggle_like(&self, actor: ActorId, post: TargetId) -> Result<LikeStatus> {
		let result = self
			.relations
			.toggle(actor, post, RelationKind::Like)
			.await?;
		Ok(LikeStatus {
			liked: result.active,
			likes_count: result.counter,
		})
	}

	pub async fn has_liked(&self, actor: ActorId, post: TargetId) -> Result<bool> {
		Ok(self
			.relations
			.is_active(actor, post, RelationKind::Like)
			.await?)
	}

	pub async fn load_comments(&self, post: TargetId) -> Result<Vec<CommentInfo>> {
		Ok(self.db.load_comments(post.0).await?)
	}

	pub async fn add_comment(
		&self, actor: ActorId, post: TargetId, content: &str,
	) -> Result<CommentInfo> {
		let content = content.trim();
		if content.is_empty() {
			return Err(Error::InvalidInput("Comment content is required".into()));
		}

		let id = match self.db.store_comment(post.0, actor.0, content).await? {
			Some(id) => id,
			None => return Err(Error::NotFound("Post not found".into())),
		};
		self.db
			.find_comment_info(id)
			.await?
			.ok_or(Error::NotFound("Comment not found".into()))
	}
}

impl AuthVerifier for Api {
	fn verify(&self, token: &str) -> Option<ActorId> { self.tokens.verify(token) }
}

impl From<user::Model> for AccountInfo {
	fn from(other: user::Model) -> Self {
		Self {
			id: other.id,
			name: other.name,
			email: other.email,
			username: other.username,
			image: other.image,
		}
	}
}

impl Error {
	/// The message that is shown to the client.
	pub fn message(&self) -> Cow<'static, str> {
		match self {
			Self::Unauthorized(m) => m.clone(),
			Self::InvalidInput(m) => m.clone(),
			Self::NotFound(m) => m.clone(),
			Self::InvalidOperation(m) => m.clone(),
			Self::Database(_) | Self::Auth(_) => "Internal Server Error".into(),
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Unauthorized(m) => write!(f, "unauthorized: {}", m),
			Self::InvalidInput(m) => write!(f, "invalid input: {}", m),
			Self::NotFound(m) => write!(f, "not found: {}", m),
			Self::InvalidOperation(m) => write!(f, "invalid operation: {}", m),
			Self::Database(e) => write!(f, "database error: {}", e),
			Self::Auth(e) => write!(f, "{}", e),
		}
	}
}

impl From<db::Error> for Error {
	fn from(other: db::Error) -> Self { Self::Database(other) }
}

impl From<auth::Error> for Error {
	fn from(other: auth::Error) -> Self { Self::Auth(other) }
}

impl From<relation::Error> for Error {
	fn from(other: relation::Error) -> Self {
		match other {
			relation::Error::SelfRelation(RelationKind::Follow) =>
				Self::InvalidOperation("Cannot follow yourself".into()),
			relation::Error::SelfRelation(kind) =>
				Self::InvalidOperation(format!("Cannot {} yourself", kind).into()),
			relation::Error::TargetNotFound(RelationKind::Like, _) =>
				Self::NotFound("Post not found".into()),
			relation::Error::TargetNotFound(RelationKind::Follow, _) =>
				Self::NotFound("User not found".into()),
			relation::Error::Database(e) => Self::Database(e),
		}
	}
}
