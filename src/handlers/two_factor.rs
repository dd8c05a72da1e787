use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::{AuthUser, PendingUser};
use crate::state::AppState;

// === 2FA Enrollment ===

/// POST /api/2fa/enable
///
/// 2FA登録を開始し、プロビジョニングQRコードをPNGで返す。
/// アクセストークンによる認証が必要。
///
/// # Security
/// - 既に2FAが有効なアカウントでは409
/// - シークレット平文はレスポンスに含めない（QRコードのみ）
pub async fn enable_2fa(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .user_repo
        .find_by_id(user.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if record.twofa_enabled {
        return Err(AppError::TotpAlreadyEnabled);
    }

    let png = state
        .totp_service
        .begin_enrollment(user.user_id, &user.user_name)
        .await?;

    tracing::info!(user_id = user.user_id, "2FA登録開始");

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

// === 2FA Verify ===

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

/// POST /api/2fa/setup/verify
///
/// 2FA登録確認。初回コード検証に成功すると2FAが有効化される。
/// アクセストークンによる認証が必要。
pub async fn verify_2fa_setup(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<VerifyRequest>,
) -> Result<StatusCode, AppError> {
    validate_totp_code(&request.code)?;

    state
        .totp_service
        .verify_code(user.user_id, &request.code, true)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct TwoFactorLoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// POST /api/2fa/verify
///
/// ログイン時の2FAコード検証。保留トークンによる認証が必要。
/// 検証に成功するとアクセス/リフレッシュトークンのペアを発行する。
///
/// # Note
/// こちらは登録確認ではないため、2FAフラグは変更しない
pub async fn verify_2fa_login(
    State(state): State<AppState>,
    user: PendingUser,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<TwoFactorLoginResponse>, AppError> {
    validate_totp_code(&request.code)?;

    state
        .totp_service
        .verify_code(user.user_id, &request.code, false)
        .await?;

    let (access_token, refresh_token) = state
        .token_service
        .issue_login_pair(&user.user_name, user.user_id)?;

    tracing::info!(user_id = user.user_id, "2FAログイン成功");

    Ok(Json(TwoFactorLoginResponse {
        access_token,
        refresh_token,
    }))
}

// === Helper Functions ===

/// TOTPコードバリデーション
fn validate_totp_code(code: &str) -> Result<(), AppError> {
    if code.is_empty() {
        return Err(AppError::Validation("認証コードは必須です".to_string()));
    }
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "認証コードは6桁の数字で入力してください".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_code() {
        let result = validate_totp_code("");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_short_code() {
        let result = validate_totp_code("12345");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_non_digit_code() {
        let result = validate_totp_code("12345a");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_code() {
        let result = validate_totp_code("123456");
        assert!(result.is_ok());
    }
}
