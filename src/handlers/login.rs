use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{TokenScope, UserPublic};
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// フルセッションレスポンス
///
/// ログイン（2FA無効ユーザー）と 2FA検証成功の両方で返る
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserPublic,
    pub refresh: String,
    pub access: String,
}

/// ログインレスポンス
///
/// 2FA有効ユーザーには一時トークンのみ返し、フルセッションは発行しない
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    MfaRequired { mfa_required: bool, temp_token: String },
    Session(SessionResponse),
}

/// POST /api/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. ユーザー認証（DB照合、is_active チェック込み）
/// 3. 2FA有効チェック
///    - 有効: MfaPendingスコープの一時トークンを発行して mfa_required を返却
///    - 無効: フルセッション（access + refresh）を発行
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&request)?;

    let user = state
        .auth_service
        .authenticate(&request.username, &request.password)
        .await?;

    let mfa = state.mfa_repo.find_by_user_id(user.id).await?;

    if let Some(ref mfa) = mfa
        && mfa.enabled
    {
        // 仮シークレット（enabled = false）は2FA未設定として扱う
        let temp_token = state
            .token_service
            .issue(user.id, TokenScope::MfaPending)
            .await?;

        tracing::info!(user_id = %user.id, "一次認証成功、2FAコード待ち");

        return Ok(Json(LoginResponse::MfaRequired {
            mfa_required: true,
            temp_token,
        }));
    }

    let pair = state.token_service.issue_session_pair(user.id).await?;

    Ok(Json(LoginResponse::Session(SessionResponse {
        user: UserPublic::from(&user),
        refresh: pair.refresh,
        access: pair.access,
    })))
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    if request.username.trim().is_empty() {
        return Err(AppError::Validation("ユーザー名は必須です".to_string()));
    }

    if request.password.is_empty() {
        return Err(AppError::Validation("パスワードは必須です".to_string()));
    }

    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn test_validate_empty_username() {
        let request = LoginRequest {
            username: "".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = LoginRequest {
            username: "alice".to_string(),
            password: "".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_short_password() {
        let request = LoginRequest {
            username: "alice".to_string(),
            password: "short".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let request = LoginRequest {
            username: "alice".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_ok());
    }

    #[test]
    fn test_mfa_required_response_shape() {
        let response = LoginResponse::MfaRequired {
            mfa_required: true,
            temp_token: "tmp".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["mfa_required"], true);
        assert_eq!(json["temp_token"], "tmp");
        // フルセッションのフィールドは含まれない
        assert!(json.get("access").is_none());
        assert!(json.get("refresh").is_none());
    }

    #[test]
    fn test_session_response_shape() {
        let user = UserPublic {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            bio: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        let response = LoginResponse::Session(SessionResponse {
            user,
            refresh: "r".to_string(),
            access: "a".to_string(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["access"], "a");
        assert_eq!(json["refresh"], "r");
        assert!(json.get("mfa_required").is_none());
        assert!(json.get("temp_token").is_none());
    }
}
