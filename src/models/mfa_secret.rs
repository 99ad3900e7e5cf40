use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// ユーザーのTOTPシークレット
///
/// シークレットは AES-256-GCM で暗号化されて保存される。平文はログ出力禁止。
/// enabled = false の行はセットアップ開始時の仮シークレットで、
/// 確認コードの検証に成功して初めて enabled = true になる。
#[derive(Debug, FromRow)]
pub struct MfaSecret {
    pub user_id: Uuid,
    pub secret_encrypted: Vec<u8>,
    pub enabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
