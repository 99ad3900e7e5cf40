use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{SessionToken, TokenScope};
use crate::repositories::SessionTokenRepository;

/// アクセストークンとリフレッシュトークンの組
#[derive(Debug)]
pub struct SessionPair {
    pub access: String,
    pub refresh: String,
}

/// セッショントークン発行サービス
///
/// # Security
/// - トークンはランダム32バイト、DBにはSHA256ハッシュのみ保存
/// - 平文トークンはログに出力しない
#[derive(Clone)]
pub struct TokenService {
    token_repo: SessionTokenRepository,
    config: Arc<Config>,
}

impl TokenService {
    pub fn new(token_repo: SessionTokenRepository, config: Arc<Config>) -> Self {
        Self { token_repo, config }
    }

    /// 指定スコープのトークンを1つ発行
    ///
    /// # Returns
    /// 平文トークン（この戻り値以外に平文が残る場所はない）
    pub async fn issue(&self, user_id: Uuid, scope: TokenScope) -> Result<String, AppError> {
        let token = Self::generate_token();
        let token_hash = Self::hash_token(&token);
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(self.ttl_secs(scope));

        self.token_repo
            .create(user_id, &token_hash, scope, expires_at)
            .await?;

        Ok(token)
    }

    /// アクセス+リフレッシュのフルセッションを発行
    pub async fn issue_session_pair(&self, user_id: Uuid) -> Result<SessionPair, AppError> {
        let access = self.issue(user_id, TokenScope::Access).await?;
        let refresh = self.issue(user_id, TokenScope::Refresh).await?;

        tracing::info!(user_id = %user_id, "フルセッション発行");

        Ok(SessionPair { access, refresh })
    }

    /// 平文トークンを解決
    ///
    /// スコープ不一致・使用済み・期限切れ・不存在はすべて `InvalidToken`。
    /// 区別して返すとトークンの状態が外部から観測できてしまう。
    pub async fn resolve(
        &self,
        token: &str,
        expected_scope: TokenScope,
    ) -> Result<SessionToken, AppError> {
        let token_hash = Self::hash_token(token);

        let session = self
            .token_repo
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or(AppError::InvalidToken)?;

        Self::validate_session(&session, expected_scope, OffsetDateTime::now_utc())?;

        Ok(session)
    }

    /// セッショントークンの状態検証
    ///
    /// resolve の実体。時刻を引数に取ることで決定的にテストできる。
    fn validate_session(
        session: &SessionToken,
        expected_scope: TokenScope,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        if session.scope != expected_scope {
            tracing::warn!(token_id = %session.id, "トークンのスコープ不一致");
            return Err(AppError::InvalidToken);
        }

        if session.consumed_at.is_some() {
            tracing::warn!(token_id = %session.id, "使用済みトークン");
            return Err(AppError::InvalidToken);
        }

        if session.expires_at < now {
            tracing::warn!(token_id = %session.id, "期限切れトークン");
            return Err(AppError::InvalidToken);
        }

        Ok(())
    }

    /// トークンを使用済みにマーク
    ///
    /// 2FA検証に成功した一時トークンは有効期限内でも再利用不可
    pub async fn consume(&self, token_id: Uuid) -> Result<(), AppError> {
        self.token_repo.mark_as_consumed(token_id).await?;
        Ok(())
    }

    fn ttl_secs(&self, scope: TokenScope) -> i64 {
        match scope {
            TokenScope::Access => self.config.access_token_ttl_secs,
            TokenScope::Refresh => self.config.refresh_token_ttl_secs,
            TokenScope::MfaPending => self.config.mfa_token_ttl_secs,
        }
    }

    /// 32バイトのランダムトークンを生成
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// トークンをSHA256でハッシュ化
    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(
        scope: TokenScope,
        expires_at: OffsetDateTime,
        consumed_at: Option<OffsetDateTime>,
    ) -> SessionToken {
        SessionToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "deadbeef".to_string(),
            scope,
            expires_at,
            consumed_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_validate_accepts_live_token_with_matching_scope() {
        let now = OffsetDateTime::now_utc();
        let token = session(TokenScope::MfaPending, now + Duration::seconds(300), None);

        assert!(TokenService::validate_session(&token, TokenScope::MfaPending, now).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_scope() {
        let now = OffsetDateTime::now_utc();
        // 一時トークンをアクセストークンとして使うことはできない
        let token = session(TokenScope::MfaPending, now + Duration::seconds(300), None);

        let result = TokenService::validate_session(&token, TokenScope::Access, now);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_validate_rejects_consumed_token() {
        let now = OffsetDateTime::now_utc();
        // 期限内でも使用済みなら無効
        let token = session(
            TokenScope::MfaPending,
            now + Duration::seconds(300),
            Some(now - Duration::seconds(10)),
        );

        let result = TokenService::validate_session(&token, TokenScope::MfaPending, now);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        let now = OffsetDateTime::now_utc();
        let token = session(TokenScope::MfaPending, now - Duration::seconds(1), None);

        let result = TokenService::validate_session(&token, TokenScope::MfaPending, now);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_generate_token_length_and_charset() {
        let token = TokenService::generate_token();
        // 32バイトのURL-safe Base64（パディングなし） = 43文字
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_is_unique() {
        let first = TokenService::generate_token();
        let second = TokenService::generate_token();
        assert_ne!(first, second);
    }

    #[test]
    fn test_hash_token_is_deterministic_sha256_hex() {
        let token = "some-opaque-token";
        let first = TokenService::hash_token(token);
        let second = TokenService::hash_token(token);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, TokenService::hash_token("other-token"));
    }
}
