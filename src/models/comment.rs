use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// コメント
///
/// parent_comment_id が Some の場合は返信コメント（1段のみ）
#[derive(Debug, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    pub author_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
