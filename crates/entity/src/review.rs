use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's free-text comment plus 1-5 rating for one catalog book.
///
/// The table keeps the historical name `comments`. Edit and delete resolve a
/// review by `(book_key, user_id)`, so those operations assume at most one
/// review per user per book even though creation does not enforce it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub text: String,

    pub user_rating: i32,

    pub user_id: i32,

    pub book_key: String,

    /// Unix timestamp (seconds), set by the server at creation.
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
