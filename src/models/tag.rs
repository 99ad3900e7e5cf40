use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}
