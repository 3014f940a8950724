use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
///
/// `id` is the generated primary key; `login_name` is the separately
/// unique human-chosen identifier. `phone_number` is a secondary lookup
/// key and is deliberately not unique in the schema.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub login_name: String,
    pub phone_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, not exposed in JSON
    pub authenticated: bool,
    pub created_at: OffsetDateTime,
}
