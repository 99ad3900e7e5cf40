use axum::Json;

use crate::extractors::AuthUser;
use crate::models::UserPublic;

/// GET /api/profile
///
/// アクセストークンに紐づくユーザー自身の情報を返す
pub async fn profile(AuthUser(user): AuthUser) -> Json<UserPublic> {
    Json(UserPublic::from(&user))
}
