use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{SessionToken, TokenScope};

#[derive(Clone)]
pub struct SessionTokenRepository {
    pool: PgPool,
}

impl SessionTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 新しいセッショントークンを作成
    ///
    /// # Arguments
    /// * `token_hash` - トークンのSHA256ハッシュ（平文は保存しない）
    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        scope: TokenScope,
        expires_at: OffsetDateTime,
    ) -> Result<SessionToken, sqlx::Error> {
        sqlx::query_as::<_, SessionToken>(
            r#"
            INSERT INTO session_tokens (user_id, token_hash, scope, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, scope, expires_at, consumed_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(scope)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// トークンハッシュでトークンを検索
    ///
    /// # Note
    /// 有効期限・使用済み・スコープの検証は TokenService 側で行う
    pub async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionToken>, sqlx::Error> {
        sqlx::query_as::<_, SessionToken>(
            r#"
            SELECT id, user_id, token_hash, scope, expires_at, consumed_at, created_at
            FROM session_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// トークンを使用済みにマーク
    ///
    /// 一時トークンは検証成功後に再利用できない
    pub async fn mark_as_consumed(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE session_tokens
            SET consumed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 期限切れトークンを削除
    ///
    /// # Returns
    /// 削除された行数
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM session_tokens
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
