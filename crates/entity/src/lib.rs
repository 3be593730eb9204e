pub mod user;
pub mod favorite;
pub mod review;

pub use user::Entity as User;
pub use favorite::Entity as Favorite;
pub use review::Entity as Review;
