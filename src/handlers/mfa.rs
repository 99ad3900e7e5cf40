use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{AuthUser, MfaTicket};
use crate::models::{MfaSecret, UserPublic};
use crate::services::TotpService;
use crate::state::AppState;

use super::login::SessionResponse;

// === 2FA Setup 開始 ===

#[derive(Debug, Serialize)]
pub struct MfaSetupResponse {
    pub secret: String,
    pub provisioning_uri: String,
    /// SVG形式のQRコード
    pub qr_code: String,
}

/// GET /api/mfa/setup
///
/// 2FA設定を開始。シークレットを生成して仮保存し、
/// プロビジョニングURIとQRコード（SVG）を返す。
///
/// # Security
/// - 平文シークレットをユーザーに見せるのはこのレスポンスの一度だけ
/// - シークレット平文はログ出力禁止
pub async fn setup_mfa(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MfaSetupResponse>, AppError> {
    if let Some(existing) = state.mfa_repo.find_by_user_id(user.id).await? {
        if existing.enabled {
            return Err(AppError::MfaAlreadyConfigured);
        }
        // 未確認の仮シークレットは破棄して再発行
        state.mfa_repo.delete_pending(user.id).await?;
    }

    let secret = TotpService::generate_secret();

    // 確認時に同じシークレットを検証できるよう、表示する前に仮保存する
    let encrypted = state.totp_service.encrypt_secret(&secret)?;
    state.mfa_repo.create(user.id, &encrypted).await?;

    let provisioning_uri = state.totp_service.provisioning_uri(&user.email, &secret)?;
    let qr_code = state.totp_service.qr_code_svg(&provisioning_uri)?;

    tracing::info!(user_id = %user.id, "2FA設定開始");

    Ok(Json(MfaSetupResponse {
        secret,
        provisioning_uri,
        qr_code,
    }))
}

// === 2FA Setup 確認 ===

#[derive(Debug, Deserialize)]
pub struct MfaConfirmRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MfaConfirmResponse {
    pub enabled: bool,
}

/// POST /api/mfa/setup
///
/// 2FA設定確認。setup_mfa で返したシークレット（仮保存済み）に対して
/// コードを検証し、成功したら有効化する。
///
/// # Security
/// - コードはログ出力禁止
pub async fn confirm_mfa(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<MfaConfirmRequest>,
) -> Result<Json<MfaConfirmResponse>, AppError> {
    validate_totp_code(&request.code)?;

    let mfa = pending_secret(state.mfa_repo.find_by_user_id(user.id).await?)?;

    // setup_mfa で仮保存した行を復号する。ここでシークレットを
    // 再生成すると、ユーザーに表示済みのシークレットと食い違う。
    let secret = state.totp_service.decrypt_secret(&mfa.secret_encrypted)?;

    if !state.totp_service.verify_code(&secret, &request.code)? {
        return Err(AppError::TotpInvalid);
    }

    // 条件付きUPDATE: 同時確認の片方が負けたら設定済みエラー
    if !state.mfa_repo.enable(user.id).await? {
        return Err(AppError::MfaAlreadyConfigured);
    }

    tracing::info!(user_id = %user.id, "2FA有効化完了");

    Ok(Json(MfaConfirmResponse { enabled: true }))
}

// === 2FA Verify（ログイン第二要素） ===

#[derive(Debug, Deserialize)]
pub struct MfaVerifyRequest {
    pub code: String,
}

/// POST /api/mfa/verify
///
/// ログインの第二要素検証。Bearerヘッダーの一時トークン（MfaPendingスコープ）
/// からユーザーを解決し、コードが正しければフルセッションを発行する。
/// 一時トークンは成功時に使用済みとなり再利用できない。
pub async fn verify_mfa(
    State(state): State<AppState>,
    ticket: MfaTicket,
    Json(request): Json<MfaVerifyRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    validate_totp_code(&request.code)?;

    let mfa = state
        .mfa_repo
        .find_by_user_id(ticket.user.id)
        .await?
        .filter(|m| m.enabled)
        .ok_or(AppError::MfaNotConfigured)?;

    let secret = state.totp_service.decrypt_secret(&mfa.secret_encrypted)?;

    if !state.totp_service.verify_code(&secret, &request.code)? {
        // 失敗してもトークンは消費しない（期限内なら再入力可能）
        return Err(AppError::TotpInvalid);
    }

    state.token_service.consume(ticket.token_id).await?;

    let pair = state.token_service.issue_session_pair(ticket.user.id).await?;

    tracing::info!(user_id = %ticket.user.id, "2FA検証成功");

    Ok(Json(SessionResponse {
        user: UserPublic::from(&ticket.user),
        refresh: pair.refresh,
        access: pair.access,
    }))
}

/// 確認対象の仮シークレット行を取り出す
///
/// 行がなければ設定未開始、enabled 済みなら二度目の設定としてエラー
fn pending_secret(mfa: Option<MfaSecret>) -> Result<MfaSecret, AppError> {
    let mfa = mfa.ok_or(AppError::MfaNotConfigured)?;
    if mfa.enabled {
        return Err(AppError::MfaAlreadyConfigured);
    }
    Ok(mfa)
}

/// TOTPコードバリデーション
fn validate_totp_code(code: &str) -> Result<(), AppError> {
    if code.is_empty() {
        return Err(AppError::Validation("認証コードは必須です".to_string()));
    }
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "認証コードは6桁の数字で入力してください".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use data_encoding::BASE32;
    use time::OffsetDateTime;
    use totp_rs::{Algorithm, TOTP};
    use uuid::Uuid;

    fn test_totp_service() -> TotpService {
        TotpService::new("TestBlog".to_string(), &STANDARD.encode([0u8; 32])).unwrap()
    }

    fn secret_row(enabled: bool, secret_encrypted: Vec<u8>) -> MfaSecret {
        MfaSecret {
            user_id: Uuid::new_v4(),
            secret_encrypted,
            enabled,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// 指定シークレットから指定時刻のコードを生成（検証と同一パラメータ）
    fn code_for(secret: &str, time: u64) -> String {
        let bytes = BASE32.decode(secret.as_bytes()).unwrap();
        TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, String::new())
            .unwrap()
            .generate(time)
    }

    #[test]
    fn test_confirm_without_setup_is_rejected() {
        let result = pending_secret(None);
        assert!(matches!(result, Err(AppError::MfaNotConfigured)));
    }

    #[test]
    fn test_second_setup_attempt_is_rejected() {
        // enabled 済みの行に対する再設定は拒否
        let result = pending_secret(Some(secret_row(true, vec![0u8; 32])));
        assert!(matches!(result, Err(AppError::MfaAlreadyConfigured)));
    }

    #[test]
    fn test_pending_row_is_accepted() {
        let row = secret_row(false, vec![1, 2, 3]);
        let mfa = pending_secret(Some(row)).unwrap();
        assert!(!mfa.enabled);
        assert_eq!(mfa.secret_encrypted, vec![1, 2, 3]);
    }

    #[test]
    fn test_confirmation_checks_the_secret_stored_at_setup() {
        let service = test_totp_service();
        let t = 1_700_000_000;

        // setup_mfa 相当: 生成したシークレットを暗号化して仮保存
        let shown_secret = TotpService::generate_secret();
        let row = secret_row(false, service.encrypt_secret(&shown_secret).unwrap());

        // confirm_mfa 相当: 仮保存した行を復号すると表示済みシークレットに一致する
        let stored_secret = service
            .decrypt_secret(&pending_secret(Some(row)).unwrap().secret_encrypted)
            .unwrap();
        assert_eq!(stored_secret, shown_secret);

        // 表示済みシークレットで生成したコードは通る
        let code = code_for(&shown_secret, t);
        assert!(service.check_at(&stored_secret, &code, t).unwrap());

        // 別途生成し直したシークレットのコードは通らない
        let regenerated = TotpService::generate_secret();
        let wrong_code = code_for(&regenerated, t);
        assert!(!service.check_at(&stored_secret, &wrong_code, t).unwrap());
    }

    #[test]
    fn test_validate_empty_code() {
        assert!(validate_totp_code("").is_err());
    }

    #[test]
    fn test_validate_short_code() {
        assert!(validate_totp_code("12345").is_err());
    }

    #[test]
    fn test_validate_long_code() {
        assert!(validate_totp_code("1234567").is_err());
    }

    #[test]
    fn test_validate_non_digit_code() {
        assert!(validate_totp_code("12345a").is_err());
    }

    #[test]
    fn test_validate_valid_code() {
        assert!(validate_totp_code("123456").is_ok());
    }
}
