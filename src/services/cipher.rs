use aes::Aes256;
use block_modes::block_padding::Pkcs7;
use block_modes::{BlockMode, Cbc};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use rand::RngCore;

use crate::error::AppError;

type Aes256Cbc = Cbc<Aes256, Pkcs7>;

/// IVの長さ（AESブロックサイズ）
const IV_LENGTH: usize = 16;

/// TOTPシークレット暗号化サービス（AES-256-CBC）
///
/// # Security
/// - 暗号化のたびにランダムIVを生成する（同一平文でも暗号文は毎回異なる）
/// - 保存形式は `hex(iv):hex(ciphertext)`、復号はこの文字列だけで完結する
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    /// 新しい SecretCipher を作成
    ///
    /// # Arguments
    /// * `key_hex` - hexエンコードされた32バイトの暗号化キー（64文字）
    pub fn new(key_hex: &str) -> Result<Self, AppError> {
        let key_bytes = HEXLOWER_PERMISSIVE
            .decode(key_hex.as_bytes())
            .map_err(|e| {
                tracing::error!(error = ?e, "暗号化キーのhexデコードエラー");
                AppError::Internal(anyhow::anyhow!("invalid encryption key format"))
            })?;

        if key_bytes.len() != 32 {
            tracing::error!(
                expected = 32,
                actual = key_bytes.len(),
                "暗号化キーの長さが不正"
            );
            return Err(AppError::Internal(anyhow::anyhow!(
                "encryption key must be 32 bytes"
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);

        Ok(Self { key })
    }

    /// 平文シークレットを暗号化
    ///
    /// # Returns
    /// `hex(iv):hex(ciphertext)` 形式の文字列
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let mut iv = [0u8; IV_LENGTH];
        rand::thread_rng().fill_bytes(&mut iv);

        let cipher = Aes256Cbc::new_from_slices(&self.key, &iv).map_err(|_| {
            tracing::error!("AES-CBC暗号化器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        let ciphertext = cipher.encrypt_vec(plaintext.as_bytes());

        Ok(format!(
            "{}:{}",
            HEXLOWER.encode(&iv),
            HEXLOWER.encode(&ciphertext)
        ))
    }

    /// 暗号化されたシークレットを復号
    ///
    /// IVセグメントが不正な場合、またはキーが一致しない場合はエラー
    pub fn decrypt(&self, stored: &str) -> Result<String, AppError> {
        let (iv_hex, ciphertext_hex) = stored.split_once(':').ok_or_else(|| {
            tracing::error!("暗号化データの形式が不正（区切り文字なし）");
            AppError::Internal(anyhow::anyhow!("invalid encrypted secret format"))
        })?;

        let iv = HEXLOWER_PERMISSIVE.decode(iv_hex.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "IVのhexデコードエラー");
            AppError::Internal(anyhow::anyhow!("invalid iv segment"))
        })?;

        if iv.len() != IV_LENGTH {
            tracing::error!(len = iv.len(), "IVの長さが不正");
            return Err(AppError::Internal(anyhow::anyhow!("invalid iv length")));
        }

        let ciphertext = HEXLOWER_PERMISSIVE
            .decode(ciphertext_hex.as_bytes())
            .map_err(|e| {
                tracing::error!(error = ?e, "暗号文のhexデコードエラー");
                AppError::Internal(anyhow::anyhow!("invalid ciphertext segment"))
            })?;

        let cipher = Aes256Cbc::new_from_slices(&self.key, &iv).map_err(|_| {
            tracing::error!("AES-CBC復号器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        let plaintext = cipher.decrypt_vec(&ciphertext).map_err(|_| {
            tracing::error!("シークレット復号エラー");
            AppError::Internal(anyhow::anyhow!("decryption error"))
        })?;

        String::from_utf8(plaintext).map_err(|e| {
            tracing::error!(error = ?e, "復号データのUTF-8変換エラー");
            AppError::Internal(anyhow::anyhow!("invalid utf8 after decryption"))
        })
    }
}
