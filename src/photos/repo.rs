use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::photos::repo_types::{Photo, Tag};

/// Insert a new photo entry.
pub async fn insert_photo(
    db: &PgPool,
    filename: &str,
    user_id: Option<Uuid>,
    uploader_id: Option<Uuid>,
) -> anyhow::Result<Photo> {
    let photo = sqlx::query_as::<_, Photo>(
        r#"
        INSERT INTO photos (filename, user_id, uploader_id)
        VALUES ($1, $2, $3)
        RETURNING id, filename, user_id, uploader_id, created_at
        "#,
    )
    .bind(filename)
    .bind(user_id)
    .bind(uploader_id)
    .fetch_one(db)
    .await
    .context("insert photo")?;

    Ok(photo)
}

/// Return all photos owned by a user, oldest first.
pub async fn list_photos_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Photo>> {
    let rows = sqlx::query_as::<_, Photo>(
        r#"
        SELECT id, filename, user_id, uploader_id, created_at
          FROM photos
         WHERE user_id = $1
         ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list photos by user")?;

    Ok(rows)
}

/// Attach a tag to a photo, creating the tag row if the name is new.
/// Tag names are not unique, so an existing row with the name is reused.
pub async fn tag_photo(db: &PgPool, photo_id: Uuid, name: &str) -> anyhow::Result<Tag> {
    let existing = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, name
          FROM tags
         WHERE name = $1
         LIMIT 1
        "#,
    )
    .bind(name)
    .fetch_optional(db)
    .await
    .context("find tag by name")?;

    let tag = match existing {
        Some(tag) => tag,
        None => sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(db)
        .await
        .context("insert tag")?,
    };

    sqlx::query(
        r#"
        INSERT INTO photo_tags (tag_id, photo_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(tag.id)
    .bind(photo_id)
    .execute(db)
    .await
    .context("attach tag to photo")?;

    Ok(tag)
}

/// Return the tags attached to a photo.
pub async fn list_tags_for_photo(db: &PgPool, photo_id: Uuid) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name
          FROM tags t
          JOIN photo_tags pt ON pt.tag_id = t.id
         WHERE pt.photo_id = $1
         ORDER BY t.name ASC
        "#,
    )
    .bind(photo_id)
    .fetch_all(db)
    .await
    .context("list tags for photo")?;

    Ok(rows)
}
