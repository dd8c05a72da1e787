use axum::http::StatusCode;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::auth::{AuthService, LoginOutcome};
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ログインレスポンス
///
/// 2FA有効ユーザーには auth_token のみ、
/// それ以外には access_token / refresh_token を返す。
/// 両方が同時に埋まることはない。
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub is_twofa_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// ログインハンドラー
///
/// POST /api/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. ユーザー認証（DB照合）
/// 3. 2FA有効なら 202 + 保留トークン、無効なら 200 + トークンペア
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    validate_login_request(&request)?;

    let auth_service = AuthService::new(state.user_repo.clone(), state.token_service.clone());

    match auth_service.login(&request.email, &request.password).await? {
        LoginOutcome::TwoFactorRequired { auth_token } => Ok((
            StatusCode::ACCEPTED,
            Json(LoginResponse {
                is_twofa_required: true,
                auth_token: Some(auth_token),
                access_token: None,
                refresh_token: None,
            }),
        )),
        LoginOutcome::LoggedIn {
            access_token,
            refresh_token,
        } => Ok((
            StatusCode::OK,
            Json(LoginResponse {
                is_twofa_required: false,
                auth_token: None,
                access_token: Some(access_token),
                refresh_token: Some(refresh_token),
            }),
        )),
    }
}

/// リフレッシュリクエスト
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// リフレッシュレスポンス
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// アクセストークン再発行ハンドラー
///
/// POST /api/refresh-access-token
///
/// リフレッシュトークンを検証し、新しいアクセストークンを返す。
/// 期限切れ／不正／未有効のエラーはそれぞれ区別して返却される。
pub async fn refresh_access_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    if request.refresh_token.trim().is_empty() {
        return Err(AppError::Validation(
            "refresh_token は必須です".to_string(),
        ));
    }

    let access_token = state
        .token_service
        .refresh_access_token(&request.refresh_token)?;

    Ok(Json(RefreshResponse { access_token }))
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    // email: 必須、メール形式
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("メールアドレスは必須です".to_string()));
    }

    // 簡易的なメール形式チェック（@ が含まれているか）
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }

    // password: 必須
    if request.password.is_empty() {
        return Err(AppError::Validation("パスワードは必須です".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_email() {
        let request = LoginRequest {
            email: "".to_string(),
            password: "password123".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let request = LoginRequest {
            email: "invalid-email".to_string(),
            password: "password123".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_ok());
    }
}
