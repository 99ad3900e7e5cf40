use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Article, Category, Tag};

#[derive(Clone)]
pub struct ArticleRepository {
    pool: PgPool,
}

impl ArticleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 記事を作成し、カテゴリ・タグの関連を同一トランザクションで登録
    ///
    /// # Errors
    /// - 存在しないカテゴリ/タグID指定時: FOREIGN KEY制約違反
    ///   呼び出し側で `AppError::Validation` に変換すること
    pub async fn create(
        &self,
        author_id: Uuid,
        title: &str,
        content: &str,
        is_published: bool,
        category_ids: &[Uuid],
        tag_ids: &[Uuid],
    ) -> Result<Article, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let article = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (author_id, title, content, is_published)
            VALUES ($1, $2, $3, $4)
            RETURNING id, author_id, title, content, is_published, created_at, updated_at
            "#,
        )
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(is_published)
        .fetch_one(&mut *tx)
        .await?;

        Self::link_categories(&mut tx, article.id, category_ids).await?;
        Self::link_tags(&mut tx, article.id, tag_ids).await?;

        tx.commit().await?;

        Ok(article)
    }

    /// 記事IDで記事を検索
    pub async fn find_by_id(&self, article_id: Uuid) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, author_id, title, content, is_published, created_at, updated_at
            FROM articles
            WHERE id = $1
            "#,
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 公開済み記事の一覧を取得（新しい順）
    pub async fn list_published(&self) -> Result<Vec<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, author_id, title, content, is_published, created_at, updated_at
            FROM articles
            WHERE is_published = true
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// 記事を更新し、カテゴリ・タグの関連を張り直す
    ///
    /// # Returns
    /// 記事が存在しない場合 None
    pub async fn update(
        &self,
        article_id: Uuid,
        title: &str,
        content: &str,
        is_published: bool,
        category_ids: &[Uuid],
        tag_ids: &[Uuid],
    ) -> Result<Option<Article>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let article = sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET title = $2, content = $3, is_published = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, author_id, title, content, is_published, created_at, updated_at
            "#,
        )
        .bind(article_id)
        .bind(title)
        .bind(content)
        .bind(is_published)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(article) = article else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM article_categories WHERE article_id = $1")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        Self::link_categories(&mut tx, article_id, category_ids).await?;
        Self::link_tags(&mut tx, article_id, tag_ids).await?;

        tx.commit().await?;

        Ok(Some(article))
    }

    /// 記事を削除（関連行は ON DELETE CASCADE で削除される）
    ///
    /// # Returns
    /// 削除できた場合 true
    pub async fn delete(&self, article_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(article_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 記事に紐づくカテゴリ一覧を取得
    pub async fn categories_of(&self, article_id: Uuid) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name, c.description, c.created_at
            FROM categories c
            JOIN article_categories ac ON ac.category_id = c.id
            WHERE ac.article_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }

    /// 記事に紐づくタグ一覧を取得
    pub async fn tags_of(&self, article_id: Uuid) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.created_at
            FROM tags t
            JOIN article_tags lnk ON lnk.tag_id = t.id
            WHERE lnk.article_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn link_categories(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        article_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        for category_id in category_ids {
            sqlx::query(
                r#"
                INSERT INTO article_categories (article_id, category_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(article_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn link_tags(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        article_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        for tag_id in tag_ids {
            sqlx::query(
                r#"
                INSERT INTO article_tags (article_id, tag_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
