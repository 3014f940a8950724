use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Photo record. No HTTP route creates one yet; the upload surface is
/// repository-level only.
///
/// `user_id` is the owning user and `uploader_id` the account that
/// uploaded the file; the two usually coincide.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: Uuid,
    pub filename: String,
    pub user_id: Option<Uuid>,
    pub uploader_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

/// Tag applied to photos through the `photo_tags` join table. Names are
/// indexed but not unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_serializes_with_both_user_references() {
        let owner = Uuid::new_v4();
        let photo = Photo {
            id: Uuid::new_v4(),
            filename: "cat.jpg".into(),
            user_id: Some(owner),
            uploader_id: Some(owner),
            created_at: OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_string(&photo).expect("serialize");
        assert!(json.contains("cat.jpg"));
        assert!(json.contains("uploader_id"));
    }
}
