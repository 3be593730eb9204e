use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's reading-status marker for one catalog book.
///
/// `book_key` is the opaque key issued by the external catalog (for example
/// `works/OL45883W`); it is never validated against the catalog at write time
/// and carries no local foreign key. At most one row exists per
/// `(user_id, book_key)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "favorites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// One of "want", "reading", "read".
    pub status: String,

    pub user_id: i32,

    pub book_key: String,
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
