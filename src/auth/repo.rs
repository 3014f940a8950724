use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::errors::RegisterError;
use crate::auth::repo_types::User;

impl User {
    /// Create a new user with an already-hashed password. A duplicate
    /// login name surfaces as `RegisterError::NameTaken` via the unique
    /// constraint.
    pub async fn create(
        db: &PgPool,
        login_name: &str,
        phone_number: &str,
        password_hash: &str,
    ) -> Result<User, RegisterError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login_name, phone_number, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, login_name, phone_number, password_hash, authenticated, created_at
            "#,
        )
        .bind(login_name)
        .bind(phone_number)
        .bind(password_hash)
        .fetch_one(db)
        .await
        .map_err(|e| match e.as_database_error().and_then(|d| d.code()) {
            Some(code) if code == "23505" => RegisterError::NameTaken,
            _ => RegisterError::Other(anyhow::Error::new(e)),
        })
    }

    /// Find a user by the unique human-chosen login name.
    pub async fn find_by_login_name(db: &PgPool, name: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login_name, phone_number, password_hash, authenticated, created_at
            FROM users
            WHERE login_name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by phone number. Phone numbers are not unique; this
    /// returns an arbitrary first match.
    pub async fn find_by_phone(db: &PgPool, phone: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login_name, phone_number, password_hash, authenticated, created_at
            FROM users
            WHERE phone_number = $1
            LIMIT 1
            "#,
        )
        .bind(phone)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Load a user by primary key when restoring a session. Unknown ids
    /// come back as `None`.
    pub async fn load_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login_name, phone_number, password_hash, authenticated, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Flip the authenticated flag after a verified login or a logout.
    pub async fn set_authenticated(
        db: &PgPool,
        id: Uuid,
        authenticated: bool,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET authenticated = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(authenticated)
        .execute(db)
        .await?;
        Ok(())
    }
}
