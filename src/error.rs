use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("ユーザーが見つかりません")]
    UserNotFound,

    #[error("メールアドレスまたはパスワードが正しくありません")]
    InvalidCredentials,

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("2FAシークレットが登録されていません")]
    SecretNotFound,

    #[error("認証コードが正しくありません")]
    CodeNotValid,

    #[error("QRコードの生成に失敗しました")]
    QrGeneration,

    #[error("二要素認証は既に有効です")]
    TotpAlreadyEnabled,

    #[error("トークンの有効期限が切れています")]
    TokenExpired,

    #[error("トークンが無効です")]
    TokenMalformed,

    #[error("トークンはまだ有効ではありません")]
    TokenNotYetValid,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "ユーザーが見つかりません".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "メールアドレスまたはパスワードが正しくありません".to_string(),
            ),
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "このメールアドレスは既に使用されています".to_string(),
            ),
            Self::SecretNotFound => (
                StatusCode::NOT_FOUND,
                "2FAシークレットが登録されていません".to_string(),
            ),
            Self::CodeNotValid => (
                StatusCode::BAD_REQUEST,
                "認証コードが正しくありません".to_string(),
            ),
            Self::QrGeneration => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "QRコードの生成に失敗しました".to_string(),
            ),
            Self::TotpAlreadyEnabled => {
                (StatusCode::CONFLICT, "二要素認証は既に有効です".to_string())
            }
            // トークンエラーは3種類を区別して返す
            // （再ログイン / トークン破棄 / 時刻ずれ待ち、と対処が異なるため）
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "トークンの有効期限が切れています".to_string(),
            ),
            Self::TokenMalformed => (
                StatusCode::UNAUTHORIZED,
                "トークンが無効、またはリクエストが不正です".to_string(),
            ),
            Self::TokenNotYetValid => (
                StatusCode::UNAUTHORIZED,
                "トークンはまだ有効ではありません".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
