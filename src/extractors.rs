use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header::AUTHORIZATION, request::Parts};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{TokenScope, User};
use crate::state::AppState;

/// アクセストークンで認証済みのユーザー
///
/// ハンドラーの引数に取ることで認証必須を宣言する。
/// 2FA検証待ちの一時トークン（MfaPendingスコープ）はここでは解決されず、
/// 通常APIには到達できない。
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_bearer(&parts.headers, state, TokenScope::Access)
            .await?
            .0;
        Ok(AuthUser(user))
    }
}

/// 2FA検証待ちの一時チケット
///
/// MfaPendingスコープのトークンのみ受理する。検証成功後に
/// `token_id` を consume してトークンを使い捨てにする。
pub struct MfaTicket {
    pub user: User,
    pub token_id: Uuid,
}

impl FromRequestParts<AppState> for MfaTicket {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, token_id) =
            resolve_bearer(&parts.headers, state, TokenScope::MfaPending).await?;
        Ok(MfaTicket { user, token_id })
    }
}

/// Bearerトークンを解決し、紐づくユーザーを返す
async fn resolve_bearer(
    headers: &HeaderMap,
    state: &AppState,
    scope: TokenScope,
) -> Result<(User, Uuid), AppError> {
    let token = bearer_token(headers).ok_or(AppError::InvalidToken)?;
    let session = state.token_service.resolve(token, scope).await?;

    let user = state
        .user_repo
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::InvalidToken)?;

    if !user.is_active {
        tracing::warn!(user_id = %user.id, "無効化済みアカウントのトークン");
        return Err(AppError::InvalidToken);
    }

    Ok((user, session.id))
}

/// Authorization ヘッダーから Bearer トークンを取り出す
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extracts_value() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
    }
}
