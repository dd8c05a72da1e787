use axum::http::StatusCode;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub age: i32,
    pub email: String,
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// ユーザー登録ハンドラー
///
/// POST /api/register
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    validate_register_request(&request)?;

    let auth_service = AuthService::new(state.user_repo.clone(), state.token_service.clone());
    let user = auth_service
        .register(&request.name, request.age, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }),
    ))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    // name: 必須、255文字以内
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("名前は必須です".to_string()));
    }
    if request.name.len() > 255 {
        return Err(AppError::Validation(
            "名前は255文字以内で入力してください".to_string(),
        ));
    }
    // age: 正の整数
    if request.age <= 0 {
        return Err(AppError::Validation(
            "年齢は1以上で入力してください".to_string(),
        ));
    }
    // email: 必須、メール形式
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("メールアドレスは必須です".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    if request.email.len() > 255 {
        return Err(AppError::Validation(
            "メールアドレスは255文字以内で入力してください".to_string(),
        ));
    }
    // password: 8文字以上
    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    Ok(())
}
