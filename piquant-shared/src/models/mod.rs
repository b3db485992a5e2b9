/// Database models
///
/// # Models
///
/// - `user`: accounts that own items and cast votes
/// - `item`: the rated content records with their vote bookkeeping
///
/// # Example
///
/// ```no_run
/// use piquant_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     CreateUser {
///         email: "user@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod item;
pub mod user;
