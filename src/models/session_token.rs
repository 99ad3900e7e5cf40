use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// セッショントークンのスコープ
///
/// `MfaPending` はパスワード認証のみ通過した状態の一時トークンで、
/// 2FAコード検証エンドポイント以外では受理されない。
/// スコープは型として区別し、クライアント側の運用に依存しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "token_scope", rename_all = "snake_case")]
pub enum TokenScope {
    Access,
    Refresh,
    MfaPending,
}

/// 発行済みセッショントークン
///
/// 平文トークンはDBに保存しない。保存するのはSHA256ハッシュのみ。
#[derive(Debug, FromRow)]
pub struct SessionToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub scope: TokenScope,
    pub expires_at: OffsetDateTime,
    pub consumed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}
