use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// 通知
///
/// 行を保存するのみで、プッシュ配信は行わない
#[derive(Debug, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub link: String,
    pub created_at: OffsetDateTime,
}
