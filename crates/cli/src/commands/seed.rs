//! Development seeding commands.

use sqlx::PgPool;

use rangoli_core::Email;

use super::{CommandError, database_url};

/// Create (or reuse) a development user.
///
/// The email is normalized exactly like the server does it, so a seeded user
/// can log straight in.
///
/// # Errors
///
/// Returns `CommandError` if the email is invalid or the insert fails.
pub async fn create_user(email: &str, name: &str, image: Option<&str>) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidInput(e.to_string()))?;

    let database_url = database_url()?;
    let pool = PgPool::connect(&database_url).await?;

    let row: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&pool)
        .await?;

    if let Some((id,)) = row {
        tracing::info!("User {} already exists (id {id})", email);
        return Ok(());
    }

    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO users (name, email, image) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(email.as_str())
    .bind(image)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Created user {} (id {id})", email);
    Ok(())
}
