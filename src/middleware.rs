use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// アクセストークンで認証されたユーザー
///
/// `Authorization: Bearer <token>` ヘッダーを検証して抽出する。
/// 保護されたエンドポイントの引数に置くだけでリクエストがゲートされる。
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub user_name: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.token_service.verify_access_token(token)?;

        Ok(Self {
            user_id: claims.user_id,
            user_name: claims.user_name,
        })
    }
}

/// 2FA保留トークンで認証されたユーザー（第一要素のみ通過済み）
///
/// アクセストークンとは別キーで署名されているため、
/// このトークンで保護リソースにはアクセスできない。
/// 2FAコード検証エンドポイント専用。
#[derive(Debug)]
pub struct PendingUser {
    pub user_id: i64,
    pub user_name: String,
}

impl FromRequestParts<AppState> for PendingUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.token_service.verify_pending_token(token)?;

        Ok(Self {
            user_id: claims.user_id,
            user_name: claims.user_name,
        })
    }
}

/// Authorization ヘッダーから Bearer トークンを取り出す
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts.headers.get(AUTHORIZATION).ok_or_else(|| {
        AppError::Validation("Authorization ヘッダーがありません".to_string())
    })?;

    let value = header.to_str().map_err(|_| AppError::TokenMalformed)?;

    value
        .strip_prefix("Bearer ")
        .ok_or(AppError::TokenMalformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extracted() {
        let parts = parts_with_header(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let parts = parts_with_header(None);
        let err = bearer_token(&parts).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_non_bearer_scheme_is_rejected() {
        let parts = parts_with_header(Some("Basic abc"));
        let err = bearer_token(&parts).unwrap_err();
        assert!(matches!(err, AppError::TokenMalformed));
    }
}
