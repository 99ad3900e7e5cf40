use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("認証エラー: {0}")]
    Authentication(String),

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("このユーザー名は既に使用されています")]
    UsernameAlreadyExists,

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("無効または期限切れのトークンです")]
    InvalidToken,

    #[error("認証コードが無効です")]
    TotpInvalid,

    #[error("二要素認証は既に設定済みです")]
    MfaAlreadyConfigured,

    #[error("二要素認証が設定されていません")]
    MfaNotConfigured,

    #[error("{0}が見つかりません")]
    NotFound(&'static str),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "ユーザー名またはパスワードが正しくありません".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::UsernameAlreadyExists => (
                StatusCode::CONFLICT,
                "このユーザー名は既に使用されています".to_string(),
            ),
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "このメールアドレスは既に使用されています".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "無効または期限切れのトークンです".to_string(),
            ),
            Self::TotpInvalid => (
                StatusCode::BAD_REQUEST,
                "認証コードが正しくありません".to_string(),
            ),
            Self::MfaAlreadyConfigured => (
                StatusCode::BAD_REQUEST,
                "二要素認証は既に設定済みです".to_string(),
            ),
            Self::MfaNotConfigured => (
                StatusCode::BAD_REQUEST,
                "二要素認証が設定されていません".to_string(),
            ),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{}が見つかりません", what)),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_maps_to_401() {
        let response = AppError::Authentication("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_token_maps_to_401() {
        let response = AppError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_totp_invalid_maps_to_400() {
        let response = AppError::TotpInvalid.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_mfa_already_configured_maps_to_400() {
        let response = AppError::MfaAlreadyConfigured.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("記事").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
