use sqlx::PgPool;

use crate::models::Tag;

#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// タグ一覧を取得（名前順）
    pub async fn list(&self) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, name, created_at
            FROM tags
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// 新しいタグを作成
    ///
    /// # Errors
    /// - 名前重複時: UNIQUE制約違反 (constraint = "tags_name_key")
    pub async fn create(&self, name: &str) -> Result<Tag, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }
}
