use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserRepository;
use crate::services::TokenService;

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// ログイン結果
///
/// 2FA有効ユーザーにはアクセストークンを発行せず、
/// 保留トークンのみを返す。アクセス/リフレッシュトークンは
/// 2FAコード検証後に発行される。
#[derive(Debug)]
pub enum LoginOutcome {
    /// 2FAコードの検証が必要（保留トークンを返却）
    TwoFactorRequired { auth_token: String },
    /// ログイン完了
    LoggedIn {
        access_token: String,
        refresh_token: String,
    },
}

/// 認証サービス
///
/// ログインと登録のワークフローを担当する。
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    token_service: TokenService,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(user_repo: UserRepository, token_service: TokenService) -> Self {
        Self {
            user_repo,
            token_service,
        }
    }

    /// ログインワークフローを実行
    ///
    /// 1. メールアドレスでユーザーを検索（ハッシュ付き）
    /// 2. パスワードを検証
    /// 3. 2FAフラグで分岐: 有効なら保留トークン、無効ならトークンペア
    ///
    /// # Note
    /// ユーザー不在とパスワード不一致はこの層では区別して返す。
    /// 列挙攻撃対策で統合するかどうかはHTTP層の判断に委ねる。
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = self
            .user_repo
            .find_by_email(email, true)
            .await?
            .ok_or_else(|| {
                tracing::warn!(email = %email, "ログイン失敗: ユーザー不在");
                AppError::UserNotFound
            })?;

        // ソーシャルログインユーザー（パスワードなし）はパスワード認証不可
        let Some(password_hash) = &user.password_hash else {
            tracing::warn!(email = %email, "ログイン失敗: パスワード未設定ユーザー");
            return Err(AppError::InvalidCredentials);
        };

        if !self.verify_password(password, password_hash)? {
            tracing::warn!(email = %email, "ログイン失敗: パスワード不一致");
            return Err(AppError::InvalidCredentials);
        }

        if user.twofa_enabled {
            // トークンペアは発行しない。2FAコード検証後に発行される
            let auth_token = self.token_service.issue_pending_token(&user.name, user.id)?;
            tracing::info!(user_id = user.id, "ログイン: 2FAコード検証待ち");
            return Ok(LoginOutcome::TwoFactorRequired { auth_token });
        }

        let (access_token, refresh_token) =
            self.token_service.issue_login_pair(&user.name, user.id)?;
        tracing::info!(user_id = user.id, "ログイン成功");

        Ok(LoginOutcome::LoggedIn {
            access_token,
            refresh_token,
        })
    }

    /// 新規ユーザーを登録
    pub async fn register(
        &self,
        name: &str,
        age: i32,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        if self.user_repo.find_by_email(email, false).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .user_repo
            .create_user(name, age, email, &password_hash)
            .await
            .map_err(|e| {
                // 検索と挿入の間に同じメールで登録された場合のUNIQUE制約違反
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.constraint() == Some("users_email_key")
                {
                    return AppError::EmailAlreadyExists;
                }
                AppError::Database(e)
            })?;

        tracing::info!(user_id = user.id, "ユーザー登録成功");

        Ok(user)
    }

    /// パスワードを検証
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
            AppError::Internal(anyhow::anyhow!("password hash parse error"))
        })?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// AuthService のインスタンス化には PgPool が必要なため、
    /// ハッシュ化ロジックを直接テスト
    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("Secret123").unwrap();
        assert_ne!(hash, "Secret123");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_hash_verifies_against_original_password() {
        let hash = hash_password("Secret123").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();

        assert!(
            Argon2::default()
                .verify_password(b"Secret123", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong_password", &parsed)
                .is_err()
        );
    }

    #[test]
    fn test_invalid_hash_format_is_rejected() {
        let invalid_hash = "invalid_hash_format";
        let parsed = PasswordHash::new(invalid_hash);
        assert!(parsed.is_err());
    }
}
