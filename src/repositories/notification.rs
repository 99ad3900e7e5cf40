use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Notification;

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 通知を作成
    pub async fn create(
        &self,
        user_id: Uuid,
        message: &str,
        link: &str,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, message, link)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, message, link, created_at
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(link)
        .fetch_one(&self.pool)
        .await
    }

    /// ユーザーの通知一覧を取得（新しい順）
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, message, link, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
