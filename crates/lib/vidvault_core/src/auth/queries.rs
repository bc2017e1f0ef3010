//! User queries.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{User, UserWithPassword};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

/// Fetch a user and its password hash by email.
pub async fn find_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserWithPassword>, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| UserWithPassword {
        user: User {
            id: r.id,
            email: r.email,
            created_at: r.created_at,
            updated_at: r.updated_at,
        },
        password_hash: r.password_hash,
    }))
}

/// Fetch a user by ID.
pub async fn get_user_by_id(pool: &SqlitePool, user_id: Uuid) -> Result<Option<User>, AuthError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Check whether an email is already registered.
pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, AuthError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Create a new user with an already-hashed password.
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<User, AuthError> {
    let now = Utc::now();
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, password_hash, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id, email, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AuthError::ValidationError("Email already registered".into())
        }
        other => AuthError::DbError(other),
    })
}

/// Delete every user. Refresh tokens and videos cascade.
pub async fn delete_all_users(pool: &SqlitePool) -> Result<u64, AuthError> {
    let result = sqlx::query("DELETE FROM users").execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};

    async fn pool() -> SqlitePool {
        let pool = db::connect_in_memory().await.expect("pool");
        migrate::migrate(&pool).await.expect("migrate");
        pool
    }

    #[tokio::test]
    async fn create_then_find_by_email() {
        let pool = pool().await;
        let created = create_user(&pool, "a@example.com", "hash").await.unwrap();

        let found = find_user_by_email(&pool, "a@example.com")
            .await
            .unwrap()
            .expect("user present");
        assert_eq!(found.user.id, created.id);
        assert_eq!(found.password_hash, "hash");

        let by_id = get_user_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_validation_error() {
        let pool = pool().await;
        create_user(&pool, "dup@example.com", "hash").await.unwrap();
        assert!(email_exists(&pool, "dup@example.com").await.unwrap());

        let err = create_user(&pool, "dup@example.com", "hash").await.unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
    }

    #[tokio::test]
    async fn delete_all_users_empties_table() {
        let pool = pool().await;
        create_user(&pool, "a@example.com", "h").await.unwrap();
        create_user(&pool, "b@example.com", "h").await.unwrap();

        assert_eq!(delete_all_users(&pool).await.unwrap(), 2);
        assert!(find_user_by_email(&pool, "a@example.com").await.unwrap().is_none());
    }
}
