use data_encoding::BASE32;
use rand::RngCore;
use totp_rs::{Algorithm, TOTP};

use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::services::SecretCipher;

/// TOTP (Time-based One-Time Password) サービス
///
/// 2FAの登録（シークレット生成〜QRコード発行）とコード検証を担当する。
///
/// # Security
/// - シークレットはAES-256-CBCで暗号化してDB保存
/// - シークレット平文はログに出力しない
#[derive(Clone)]
pub struct TotpService {
    issuer: String,
    user_repo: UserRepository,
    cipher: SecretCipher,
}

impl TotpService {
    /// 新しい TotpService を作成
    pub fn new(issuer: String, user_repo: UserRepository, cipher: SecretCipher) -> Self {
        Self {
            issuer,
            user_repo,
            cipher,
        }
    }

    /// 20バイトのランダムシークレットを生成し、Base32でエンコード
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32.encode(&bytes)
    }

    /// 2FA登録を開始し、プロビジョニングQRコード（PNG）を返す
    ///
    /// シークレットを生成・暗号化してDBに保存してから
    /// `otpauth://totp/{issuer}:{user_name}?secret={secret}&issuer={issuer}`
    /// のQRコードを描画する。
    ///
    /// # Note
    /// 保存後にQR描画が失敗した場合、新しいシークレットは保存されたまま残る。
    /// 前のシークレットは既に上書きされているため、呼び出し側は登録を
    /// やり直す必要がある（再登録で再度上書きされる）。
    pub async fn begin_enrollment(
        &self,
        user_id: i64,
        user_name: &str,
    ) -> Result<Vec<u8>, AppError> {
        let secret = Self::generate_secret();

        let encrypted = self.cipher.encrypt(&secret)?;
        self.user_repo.set_twofa_secret(user_id, &encrypted).await?;

        let totp = build_totp(Some(self.issuer.clone()), user_name, &secret)?;
        let png = totp.get_qr_png().map_err(|e| {
            tracing::error!(error = %e, user_id, "QRコード生成エラー");
            AppError::QrGeneration
        })?;

        tracing::info!(user_id, "2FAシークレット発行");

        Ok(png)
    }

    /// TOTPコードを検証
    ///
    /// # Arguments
    /// * `confirm_enrollment` - true の場合、検証成功時に2FAを有効化する
    ///   （登録確認）。false の場合は状態を変更しない（ログイン時の検証）。
    ///
    /// # Note
    /// 前後1ステップの時間ウィンドウを許容（±30秒）
    pub async fn verify_code(
        &self,
        user_id: i64,
        code: &str,
        confirm_enrollment: bool,
    ) -> Result<(), AppError> {
        // 入力検証: コードは6桁の数字のみ
        if !is_valid_code_format(code) {
            return Err(AppError::CodeNotValid);
        }

        let encrypted = self
            .user_repo
            .get_twofa_secret(user_id)
            .await?
            .ok_or(AppError::SecretNotFound)?;

        let secret = self.cipher.decrypt(&encrypted)?;
        let totp = build_totp(None, "", &secret)?;

        let current_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| {
                tracing::error!(error = ?e, "システム時刻取得エラー");
                AppError::Internal(anyhow::anyhow!("system time error"))
            })?
            .as_secs();

        // check は内部で skew を考慮して検証
        if !totp.check(code, current_time) {
            tracing::warn!(user_id, "2FAコード検証失敗");
            return Err(AppError::CodeNotValid);
        }

        if confirm_enrollment {
            self.user_repo.set_twofa_enabled(user_id, true).await?;
            tracing::info!(user_id, "2FA有効化完了");
        }

        Ok(())
    }
}

/// TOTPコードの形式チェック（6桁の数字）
fn is_valid_code_format(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

/// TOTP オブジェクトを作成
///
/// issuer を渡すとQRコード／プロビジョニングURI用、
/// None なら検証専用
fn build_totp(issuer: Option<String>, account_name: &str, secret: &str) -> Result<TOTP, AppError> {
    let secret_bytes = BASE32.decode(secret.as_bytes()).map_err(|e| {
        tracing::error!(error = ?e, "シークレットのBase32デコードエラー");
        AppError::Internal(anyhow::anyhow!("invalid base32 secret"))
    })?;

    TOTP::new(
        Algorithm::SHA1,
        6,  // 6桁
        1,  // skew: 前後1ステップ許容
        30, // period: 30秒
        secret_bytes,
        issuer,
        account_name.to_string(),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "TOTP作成エラー");
        AppError::Internal(anyhow::anyhow!("totp creation error"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret() {
        let secret = TotpService::generate_secret();
        // Base32エンコードされた20バイト = 32文字
        assert_eq!(secret.len(), 32);
        // Base32文字のみ
        assert!(
            secret
                .chars()
                .all(|c| "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567".contains(c))
        );
    }

    #[test]
    fn test_current_window_code_is_accepted() {
        let secret = TotpService::generate_secret();
        let totp = build_totp(None, "", &secret).unwrap();

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let code = totp.generate(now);
        assert!(totp.check(&code, now));
    }

    #[test]
    fn test_adjacent_window_code_is_accepted() {
        let secret = TotpService::generate_secret();
        let totp = build_totp(None, "", &secret).unwrap();

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // 1ステップ前のコードも許容される（skew = 1）
        let previous_code = totp.generate(now - 30);
        assert!(totp.check(&previous_code, now));
    }

    #[test]
    fn test_wrong_code_is_rejected() {
        let secret = TotpService::generate_secret();
        let totp = build_totp(None, "", &secret).unwrap();

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // 各桁を反転させたコードは一致しない
        let code = totp.generate(now);
        let wrong_code: String = code
            .chars()
            .map(|c| if c == '0' { '1' } else { '0' })
            .collect();
        assert!(!totp.check(&wrong_code, now));
    }

    #[test]
    fn test_provisioning_url_format() {
        let secret = TotpService::generate_secret();
        let totp = build_totp(Some("Task Management".to_string()), "taro", &secret).unwrap();

        let url = totp.get_url();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains(&format!("secret={secret}")));
        assert!(url.contains("issuer=Task%20Management"));
    }

    #[test]
    fn test_code_format_validation() {
        assert!(is_valid_code_format("123456"));
        // 6桁でない
        assert!(!is_valid_code_format("12345"));
        assert!(!is_valid_code_format("1234567"));
        // 数字以外を含む
        assert!(!is_valid_code_format("12345a"));
        assert!(!is_valid_code_format(""));
    }
}
