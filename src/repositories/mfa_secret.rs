use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MfaSecret;

#[derive(Clone)]
pub struct MfaSecretRepository {
    pool: PgPool,
}

impl MfaSecretRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ユーザーIDでTOTPシークレットを検索
    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<MfaSecret>, sqlx::Error> {
        sqlx::query_as::<_, MfaSecret>(
            r#"
            SELECT user_id, secret_encrypted, enabled, created_at, updated_at
            FROM mfa_secrets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 仮シークレットを作成
    ///
    /// # Note
    /// 作成時は enabled = false
    /// セットアップ確認のコード検証に成功したら enable() を呼び出す
    pub async fn create(
        &self,
        user_id: Uuid,
        secret_encrypted: &[u8],
    ) -> Result<MfaSecret, sqlx::Error> {
        sqlx::query_as::<_, MfaSecret>(
            r#"
            INSERT INTO mfa_secrets (user_id, secret_encrypted)
            VALUES ($1, $2)
            RETURNING user_id, secret_encrypted, enabled, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(secret_encrypted)
        .fetch_one(&self.pool)
        .await
    }

    /// 仮シークレットを有効化
    ///
    /// enabled = false の行のみ更新する条件付きUPDATE。
    /// 同時に2つの確認リクエストが来ても片方しか成功しない。
    ///
    /// # Returns
    /// 更新できた場合 true
    pub async fn enable(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE mfa_secrets
            SET enabled = true, updated_at = NOW()
            WHERE user_id = $1 AND enabled = false
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 未確認の仮シークレットを削除
    ///
    /// enabled = true の確定済みシークレットは削除しない（ローテーション機能なし）
    pub async fn delete_pending(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM mfa_secrets
            WHERE user_id = $1 AND enabled = false
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
