use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "posts")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	pub author_id: i64,
	pub content: Option<String>,
	/// URL of an image, as handed out by the upload service.
	pub image: Option<String>,
	pub video: Option<String>,
	pub created_at: i64,
	pub updated_at: i64,
	/// Denormalized count of the rows in `likes` that point at this post.
	pub likes_count: i64,
	pub comments_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::AuthorId",
		to = "super::user::Column::Id"
	)]
	Author,
	#[sea_orm(has_many = "super::like::Entity")]
	Like,
	#[sea_orm(has_many = "super::comment::Entity")]
	Comment,
}

impl Related<super::user::Entity> for Entity {
	fn to() -> RelationDef { Relation::Author.def() }
}

impl Related<super::like::Entity> for Entity {
	fn to() -> RelationDef { Relation::Like.def() }
}

impl Related<super::comment::Entity> for Entity {
	fn to() -> RelationDef { Relation::Comment.def() }
}

impl ActiveModelBehavior for ActiveModel {}
