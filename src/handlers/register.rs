use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::UserPublic;
use crate::services::auth::hash_password;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String, // Deserialize後すぐハッシュ化するためSecretBox不要
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserPublic,
    pub message: String,
}

/// POST /api/register
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    validate_register_request(&request)?;

    let password_hash = hash_password(&request.password)?;

    let user = state
        .user_repo
        .create_user(
            &request.username,
            &request.email,
            &password_hash,
            &request.bio,
        )
        .await
        .map_err(|e| {
            // UNIQUE制約違反チェック
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.constraint() {
                    Some("users_username_key") => return AppError::UsernameAlreadyExists,
                    Some("users_email_key") => return AppError::EmailAlreadyExists,
                    _ => {}
                }
            }
            AppError::Database(e)
        })?;

    tracing::info!(username = %request.username, "ユーザー登録成功");

    Ok(Json(RegisterResponse {
        user: UserPublic::from(&user),
        message: "ユーザー登録が完了しました".to_string(),
    }))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    // username: 必須、3〜32文字
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("ユーザー名は必須です".to_string()));
    }
    if username.len() < 3 || username.len() > 32 {
        return Err(AppError::Validation(
            "ユーザー名は3〜32文字で入力してください".to_string(),
        ));
    }

    // email: 必須、メール形式
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("メールアドレスは必須です".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }

    // password: 8文字以上
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

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
            bio: String::new(),
        }
    }

    #[test]
    fn test_validate_empty_username() {
        let mut request = valid_request();
        request.username = "".to_string();
        assert!(validate_register_request(&request).is_err());
    }

    #[test]
    fn test_validate_short_username() {
        let mut request = valid_request();
        request.username = "ab".to_string();
        assert!(validate_register_request(&request).is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let mut request = valid_request();
        request.email = "invalid-email".to_string();
        assert!(validate_register_request(&request).is_err());
    }

    #[test]
    fn test_validate_short_password() {
        let mut request = valid_request();
        request.password = "short".to_string();
        assert!(validate_register_request(&request).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        assert!(validate_register_request(&valid_request()).is_ok());
    }
}
