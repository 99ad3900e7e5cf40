use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{
    ArticleRepository, CategoryRepository, CommentRepository, MfaSecretRepository,
    NotificationRepository, SessionTokenRepository, TagRepository, UserRepository,
};
use crate::services::{AuthService, TokenService, TotpService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: UserRepository,
    /// TOTPシークレットリポジトリ
    pub mfa_repo: MfaSecretRepository,
    /// 記事リポジトリ
    pub article_repo: ArticleRepository,
    /// カテゴリリポジトリ
    pub category_repo: CategoryRepository,
    /// タグリポジトリ
    pub tag_repo: TagRepository,
    /// コメントリポジトリ
    pub comment_repo: CommentRepository,
    /// 通知リポジトリ
    pub notification_repo: NotificationRepository,
    /// 認証サービス
    pub auth_service: AuthService,
    /// TOTPサービス
    pub totp_service: TotpService,
    /// セッショントークンサービス
    pub token_service: TokenService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let user_repo = UserRepository::new(db_pool.clone());
        let mfa_repo = MfaSecretRepository::new(db_pool.clone());
        let article_repo = ArticleRepository::new(db_pool.clone());
        let category_repo = CategoryRepository::new(db_pool.clone());
        let tag_repo = TagRepository::new(db_pool.clone());
        let comment_repo = CommentRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone());
        let totp_service = TotpService::new(
            config.totp_issuer.clone(),
            config.encryption_key.expose_secret(),
        )?;
        let token_service = TokenService::new(
            SessionTokenRepository::new(db_pool.clone()),
            config.clone(),
        );

        Ok(Self {
            db_pool,
            config,
            user_repo,
            mfa_repo,
            article_repo,
            category_repo,
            tag_repo,
            comment_repo,
            notification_repo,
            auth_service,
            totp_service,
            token_service,
        })
    }
}
