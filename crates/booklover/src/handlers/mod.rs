pub mod accounts;
pub mod books;
pub mod current_user;
pub mod favorites;
pub mod reviews;
