use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, OsRng},
};
use data_encoding::BASE32;
use qrcode::QrCode;
use qrcode::render::svg;
use rand::RngCore;
use totp_rs::{Algorithm, TOTP};

use crate::error::AppError;

/// TOTPの時間ステップ（秒）
const TOTP_PERIOD: u64 = 30;
/// 許容する時間ステップのずれ（前後）
const TOTP_SKEW: u8 = 1;
/// コード桁数
const TOTP_DIGITS: usize = 6;

/// TOTP (Time-based One-Time Password) サービス
///
/// # Security
/// - シークレットはAES-256-GCMで暗号化してDB保存
/// - シークレット平文・コードはログに出力しない
#[derive(Clone)]
pub struct TotpService {
    issuer: String,
    encryption_key: [u8; 32],
}

impl TotpService {
    /// 新しい TotpService を作成
    ///
    /// # Arguments
    /// * `issuer` - TOTP発行者名（認証アプリに表示される）
    /// * `encryption_key_base64` - Base64エンコードされた32バイトの暗号化キー
    pub fn new(issuer: String, encryption_key_base64: &str) -> Result<Self, AppError> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};

        let key_bytes = STANDARD.decode(encryption_key_base64).map_err(|e| {
            tracing::error!(error = ?e, "TOTP暗号化キーのBase64デコードエラー");
            AppError::Internal(anyhow::anyhow!("invalid encryption key format"))
        })?;

        let encryption_key: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            tracing::error!(expected = 32, actual = key_bytes.len(), "TOTP暗号化キーの長さが不正");
            AppError::Internal(anyhow::anyhow!("encryption key must be 32 bytes"))
        })?;

        Ok(Self {
            issuer,
            encryption_key,
        })
    }

    /// 20バイトのランダムシークレットを生成し、Base32でエンコード
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32.encode(&bytes)
    }

    /// otpauth:// 形式のプロビジョニングURIを構築
    ///
    /// # Arguments
    /// * `account` - アカウントラベル（ユーザーのメールアドレス）
    /// * `secret` - Base32エンコードされたシークレット
    pub fn provisioning_uri(&self, account: &str, secret: &str) -> Result<String, AppError> {
        let totp = self.build_totp(secret, Some(account))?;
        Ok(totp.get_url())
    }

    /// プロビジョニングURIをQRコードとしてレンダリング（SVG形式）
    pub fn qr_code_svg(&self, provisioning_uri: &str) -> Result<String, AppError> {
        let code = QrCode::new(provisioning_uri.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "QRコード生成エラー");
            AppError::Internal(anyhow::anyhow!("qr code generation error"))
        })?;

        Ok(code
            .render::<svg::Color>()
            .min_dimensions(240, 240)
            .build())
    }

    /// TOTPコードを検証
    ///
    /// # Note
    /// 前後1ステップの時間ウィンドウを許容（±30秒）
    pub fn verify_code(&self, secret: &str, code: &str) -> Result<bool, AppError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| {
                tracing::error!(error = ?e, "システム時刻取得エラー");
                AppError::Internal(anyhow::anyhow!("system time error"))
            })?
            .as_secs();

        self.check_at(secret, code, now)
    }

    /// 指定時刻を基準にTOTPコードを検証
    ///
    /// verify_code の実体。時刻を引数に取ることで決定的にテストできる。
    pub(crate) fn check_at(&self, secret: &str, code: &str, time: u64) -> Result<bool, AppError> {
        // 入力検証: コードは6桁の数字のみ
        if code.len() != TOTP_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let totp = self.build_totp(secret, None)?;

        // check は skew を考慮して前後ステップも検証する
        Ok(totp.check(code, time))
    }

    /// シークレットをAES-256-GCMで暗号化
    ///
    /// # Returns
    /// 96ビットnonce (12バイト) + 暗号文
    pub fn encrypt_secret(&self, secret: &str) -> Result<Vec<u8>, AppError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, secret.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "シークレット暗号化エラー");
            AppError::Internal(anyhow::anyhow!("encryption error"))
        })?;

        let mut result = Vec::with_capacity(12 + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// 暗号化されたシークレットを復号
    pub fn decrypt_secret(&self, encrypted: &[u8]) -> Result<String, AppError> {
        if encrypted.len() < 12 {
            tracing::error!(len = encrypted.len(), "暗号化データが短すぎる");
            return Err(AppError::Internal(anyhow::anyhow!(
                "encrypted data too short"
            )));
        }

        let cipher = self.cipher()?;

        let (nonce_bytes, ciphertext) = encrypted.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|e| {
            tracing::error!(error = ?e, "シークレット復号エラー");
            AppError::Internal(anyhow::anyhow!("decryption error"))
        })?;

        String::from_utf8(plaintext).map_err(|e| {
            tracing::error!(error = ?e, "復号データのUTF-8変換エラー");
            AppError::Internal(anyhow::anyhow!("invalid utf8 after decryption"))
        })
    }

    fn cipher(&self) -> Result<Aes256Gcm, AppError> {
        Aes256Gcm::new_from_slice(&self.encryption_key).map_err(|e| {
            tracing::error!(error = ?e, "AES-GCM暗号化器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })
    }

    /// TOTP オブジェクトを作成
    ///
    /// account が Some の場合は issuer 付き（プロビジョニングURI用）、
    /// None の場合はコード検証専用
    fn build_totp(&self, secret: &str, account: Option<&str>) -> Result<TOTP, AppError> {
        let secret_bytes = BASE32.decode(secret.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "シークレットのBase32デコードエラー");
            AppError::Internal(anyhow::anyhow!("invalid base32 secret"))
        })?;

        let (issuer, account_name) = match account {
            Some(account) => (Some(self.issuer.clone()), account.to_string()),
            None => (None, String::new()),
        };

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_PERIOD,
            secret_bytes,
            issuer,
            account_name,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "TOTP作成エラー");
            AppError::Internal(anyhow::anyhow!("totp creation error"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    fn create_test_service() -> TotpService {
        // テスト用の32バイトキー
        let key = [0u8; 32];
        let key_base64 = STANDARD.encode(key);
        TotpService::new("TestBlog".to_string(), &key_base64).unwrap()
    }

    /// 基準時刻におけるコードを直接生成（検証と同一パラメータ）
    fn code_at(secret: &str, time: u64) -> String {
        let secret_bytes = BASE32.decode(secret.as_bytes()).unwrap();
        let totp = TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_PERIOD,
            secret_bytes,
            None,
            String::new(),
        )
        .unwrap();
        totp.generate(time)
    }

    #[test]
    fn test_generate_secret() {
        let secret = TotpService::generate_secret();
        // Base32エンコードされた20バイト = 32文字
        assert_eq!(secret.len(), 32);
        assert!(
            secret
                .chars()
                .all(|c| "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567".contains(c))
        );
    }

    #[test]
    fn test_current_step_code_is_accepted() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();
        let t = 1_700_000_000;

        assert!(service.check_at(&secret, &code_at(&secret, t), t).unwrap());
    }

    #[test]
    fn test_adjacent_step_codes_are_accepted() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();
        let t = 1_700_000_000;

        // 前後1ステップは時計ずれとして許容
        assert!(
            service
                .check_at(&secret, &code_at(&secret, t - 30), t)
                .unwrap()
        );
        assert!(
            service
                .check_at(&secret, &code_at(&secret, t + 30), t)
                .unwrap()
        );
    }

    #[test]
    fn test_distant_step_codes_are_rejected() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();
        let t = 1_700_000_000;

        // 2ステップ以上離れたコードは拒否
        assert!(
            !service
                .check_at(&secret, &code_at(&secret, t - 90), t)
                .unwrap()
        );
        assert!(
            !service
                .check_at(&secret, &code_at(&secret, t + 90), t)
                .unwrap()
        );
    }

    #[test]
    fn test_malformed_code_is_rejected() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();
        let t = 1_700_000_000;

        // 6桁でない
        assert!(!service.check_at(&secret, "12345", t).unwrap());
        // 数字以外を含む
        assert!(!service.check_at(&secret, "12345a", t).unwrap());
    }

    #[test]
    fn test_provisioning_uri_contains_issuer_and_account() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();

        let uri = service
            .provisioning_uri("alice@example.com", &secret)
            .unwrap();
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("TestBlog"));
        assert!(uri.contains(&secret));
    }

    #[test]
    fn test_qr_code_svg_renders() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();

        let uri = service.provisioning_uri("alice@example.com", &secret).unwrap();
        let svg = service.qr_code_svg(&uri).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_encrypt_decrypt_secret() {
        let service = create_test_service();
        let original = TotpService::generate_secret();

        let encrypted = service.encrypt_secret(&original).unwrap();
        // 12バイトnonce + 暗号文 + 16バイトtag
        assert!(encrypted.len() > 12);
        // 平文がそのまま含まれていないこと
        assert!(!encrypted.windows(original.len()).any(|w| w == original.as_bytes()));

        let decrypted = service.decrypt_secret(&encrypted).unwrap();
        assert_eq!(original, decrypted);
    }

    #[test]
    fn test_decrypt_truncated_data_fails() {
        let service = create_test_service();
        assert!(service.decrypt_secret(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_new_with_invalid_key_length() {
        let short_key = STANDARD.encode([0u8; 16]);
        let result = TotpService::new("TestBlog".to_string(), &short_key);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_with_invalid_base64() {
        let result = TotpService::new("TestBlog".to_string(), "not-valid-base64!!!");
        assert!(result.is_err());
    }
}
