use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Comment;

#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// コメントIDでコメントを検索
    pub async fn find_by_id(&self, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, article_id, author_id, parent_comment_id, content, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 記事のトップレベルコメント一覧を取得（古い順）
    pub async fn list_top_level(&self, article_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, article_id, author_id, parent_comment_id, content, created_at, updated_at
            FROM comments
            WHERE article_id = $1 AND parent_comment_id IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }

    /// 記事の全コメント一覧を取得（返信を含む、古い順）
    pub async fn list_for_article(&self, article_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, article_id, author_id, parent_comment_id, content, created_at, updated_at
            FROM comments
            WHERE article_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }

    /// 新しいコメントを作成
    pub async fn create(
        &self,
        article_id: Uuid,
        author_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (article_id, author_id, parent_comment_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, article_id, author_id, parent_comment_id, content, created_at, updated_at
            "#,
        )
        .bind(article_id)
        .bind(author_id)
        .bind(parent_comment_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }
}
