use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	#[sea_orm(unique)]
	pub email: String,
	#[sea_orm(unique)]
	pub username: String,
	/// The argon2 hash of the password, in PHC string format.
	pub password: String,
	pub name: Option<String>,
	pub description: Option<String>,
	pub image: Option<String>,
	pub location: Option<String>,
	/// Denormalized count of the rows in `follows` that point at this user.
	pub follower_count: i64,
	pub created_at: i64,
	pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::post::Entity")]
	Post,
}

impl Related<super::post::Entity> for Entity {
	fn to() -> RelationDef { Relation::Post.def() }
}

impl ActiveModelBehavior for ActiveModel {}
