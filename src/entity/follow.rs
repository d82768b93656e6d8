use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "follows")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	pub follower_id: i64,
	/// The user being followed.
	pub following_id: i64,
	pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::FollowerId",
		to = "super::user::Column::Id"
	)]
	Follower,
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::FollowingId",
		to = "super::user::Column::Id"
	)]
	Following,
}

impl ActiveModelBehavior for ActiveModel {}
