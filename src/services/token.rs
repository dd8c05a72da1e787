use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::AppError;

/// JWTクレーム
///
/// アクセス/リフレッシュ/2FA保留の3種類のトークンで共通。
/// 既存クライアントが読む形式に合わせて camelCase でシリアライズする。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub user_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// アクセストークンの有効期限（10分）
const ACCESS_TOKEN_TTL: Duration = Duration::minutes(10);
/// リフレッシュトークンの有効期限（7日）
const REFRESH_TOKEN_TTL: Duration = Duration::days(7);
/// 2FA保留トークンの有効期限（1時間）
const PENDING_TOKEN_TTL: Duration = Duration::hours(1);

/// トークン発行・検証サービス
///
/// # Security
/// 3種類のトークンは別々のキーで署名する。
/// キーが異なるため、捕捉されたトークンを別用途に流用することはできない
/// （保留トークンでは保護リソースにアクセスできない）。
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    pending_encoding: EncodingKey,
    pending_decoding: DecodingKey,
}

impl TokenService {
    /// 新しい TokenService を作成
    pub fn new(access_secret: &str, refresh_secret: &str, twofa_secret: &str) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            pending_encoding: EncodingKey::from_secret(twofa_secret.as_bytes()),
            pending_decoding: DecodingKey::from_secret(twofa_secret.as_bytes()),
        }
    }

    /// ログイン用のアクセス/リフレッシュトークンのペアを発行
    pub fn issue_login_pair(
        &self,
        user_name: &str,
        user_id: i64,
    ) -> Result<(String, String), AppError> {
        let access_token = self.sign(&self.access_encoding, user_name, user_id, ACCESS_TOKEN_TTL)?;
        let refresh_token =
            self.sign(&self.refresh_encoding, user_name, user_id, REFRESH_TOKEN_TTL)?;
        Ok((access_token, refresh_token))
    }

    /// 2FA保留トークンを発行
    ///
    /// 第一要素（パスワード）の検証成功を証明するだけのトークン。
    /// 2FAコード検証エンドポイントでのみ受理される。
    pub fn issue_pending_token(&self, user_name: &str, user_id: i64) -> Result<String, AppError> {
        self.sign(&self.pending_encoding, user_name, user_id, PENDING_TOKEN_TTL)
    }

    /// リフレッシュトークンを検証し、新しいアクセストークンを発行
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<String, AppError> {
        let claims = self.verify(refresh_token, &self.refresh_decoding)?;
        self.sign(
            &self.access_encoding,
            &claims.user_name,
            claims.user_id,
            ACCESS_TOKEN_TTL,
        )
    }

    /// アクセストークンを検証してクレームを返す
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.access_decoding)
    }

    /// 2FA保留トークンを検証してクレームを返す
    pub fn verify_pending_token(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.pending_decoding)
    }

    fn sign(
        &self,
        key: &EncodingKey,
        user_name: &str,
        user_id: i64,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            user_id,
            user_name: user_name.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
        };

        encode(&Header::default(), &claims, key).map_err(|e| {
            tracing::error!(error = ?e, "トークン署名エラー");
            AppError::Internal(anyhow::anyhow!("token signing error"))
        })
    }

    fn verify(&self, token: &str, key: &DecodingKey) -> Result<Claims, AppError> {
        decode::<Claims>(token, key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                ErrorKind::ImmatureSignature => AppError::TokenNotYetValid,
                _ => AppError::TokenMalformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> TokenService {
        TokenService::new("access-secret", "refresh-secret", "twofa-secret")
    }

    #[test]
    fn test_issue_login_pair_tokens_are_distinct() {
        let service = create_test_service();
        let (access_token, refresh_token) = service.issue_login_pair("taro", 1).unwrap();

        assert!(!access_token.is_empty());
        assert!(!refresh_token.is_empty());
        assert_ne!(access_token, refresh_token);
    }

    #[test]
    fn test_verify_access_token_returns_claims() {
        let service = create_test_service();
        let (access_token, _) = service.issue_login_pair("taro", 42).unwrap();

        let claims = service.verify_access_token(&access_token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.user_name, "taro");
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let service = create_test_service();
        let (_, refresh_token) = service.issue_login_pair("taro", 1).unwrap();

        // リフレッシュトークンはアクセストークンのキーでは検証できない
        let err = service.verify_access_token(&refresh_token).unwrap_err();
        assert!(matches!(err, AppError::TokenMalformed));
    }

    #[test]
    fn test_refresh_with_access_token_fails() {
        let service = create_test_service();
        let (access_token, _) = service.issue_login_pair("taro", 1).unwrap();

        // アクセストークンのキーで署名されたトークンは refresh に使えない
        let err = service.refresh_access_token(&access_token).unwrap_err();
        assert!(matches!(err, AppError::TokenMalformed));
    }

    #[test]
    fn test_refresh_issues_verifiable_access_token() {
        let service = create_test_service();
        let (_, refresh_token) = service.issue_login_pair("taro", 7).unwrap();

        let new_access_token = service.refresh_access_token(&refresh_token).unwrap();
        let claims = service.verify_access_token(&new_access_token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.user_name, "taro");
    }

    #[test]
    fn test_pending_token_is_not_an_access_token() {
        let service = create_test_service();
        let pending_token = service.issue_pending_token("taro", 1).unwrap();

        let err = service.verify_access_token(&pending_token).unwrap_err();
        assert!(matches!(err, AppError::TokenMalformed));

        // 保留トークン用のキーでは検証できる
        let claims = service.verify_pending_token(&pending_token).unwrap();
        assert_eq!(claims.user_id, 1);
    }

    #[test]
    fn test_expired_token() {
        let service = create_test_service();

        // 有効期限切れのトークンを直接作成（leeway 60秒を超える過去）
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            user_id: 1,
            user_name: "taro".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &service.access_encoding).unwrap();

        let err = service.verify_access_token(&token).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn test_claims_serialize_as_camel_case() {
        let claims = Claims {
            user_id: 1,
            user_name: "taro".to_string(),
            iat: 0,
            exp: 0,
        };

        // 既存クライアントが読むペイロード形式
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("userName").is_some());
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let service = create_test_service();
        let err = service.verify_access_token("not.a.jwt").unwrap_err();
        assert!(matches!(err, AppError::TokenMalformed));
    }
}
