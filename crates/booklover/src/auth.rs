use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use entity::user;

use crate::crypto;
use crate::db::is_unique_violation;
use crate::util::{now_ts, random_bytes};

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-placeholder.png";

/// Input for account creation. The password arrives in plaintext and leaves
/// this module only as a hash.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("username or e-mail already taken")]
    DuplicateIdentity,
    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Create an account. Uniqueness of username and e-mail is enforced by the
/// storage constraints and surfaced as `DuplicateIdentity`.
pub async fn signup(db: &DatabaseConnection, new: NewUser) -> Result<user::Model, SignupError> {
    let salt = random_bytes(crypto::SALT_LEN);
    let iterations = crypto::DEFAULT_ITERATIONS;
    let hash = crypto::hash_password(new.password.as_bytes(), &salt, iterations);

    let image_url = new
        .image_url
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string());

    let active = user::ActiveModel {
        first_name: Set(new.first_name),
        last_name: Set(new.last_name),
        email: Set(new.email),
        username: Set(new.username),
        image_url: Set(image_url),
        password_hash: Set(hash),
        salt: Set(salt),
        password_iterations: Set(iterations as i32),
        created_at: Set(now_ts()),
        ..Default::default()
    };

    match active.insert(db).await {
        Ok(u) => Ok(u),
        Err(e) if is_unique_violation(&e) => Err(SignupError::DuplicateIdentity),
        Err(e) => Err(SignupError::Db(e)),
    }
}

/// Look up a user by exact username and verify the password.
///
/// Unknown username and wrong password both come back as
/// `InvalidCredentials`; nothing here reveals which one it was.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<user::Model, AuthError> {
    let Some(u) = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
    else {
        return Err(AuthError::InvalidCredentials);
    };

    if !crypto::verify_password(
        password.as_bytes(),
        &u.salt,
        &u.password_hash,
        u.password_iterations as u32,
    ) {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(u)
}
