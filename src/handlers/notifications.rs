use axum::{Json, extract::State};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::models::Notification;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub message: String,
    pub link: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Notification> for NotificationResponse {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            message: notification.message.clone(),
            link: notification.link.clone(),
            created_at: notification.created_at,
        }
    }
}

/// GET /api/notifications
///
/// 認証ユーザー自身の通知のみ返す（新しい順）
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let notifications = state.notification_repo.list_for_user(user.id).await?;
    Ok(Json(
        notifications.iter().map(NotificationResponse::from).collect(),
    ))
}
