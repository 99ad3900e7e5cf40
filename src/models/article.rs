use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// 記事
///
/// カテゴリ・タグとの関連は article_categories / article_tags の中間テーブルで保持
#[derive(Debug, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
