use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// ユーザー（認証情報レコード）
///
/// password_hash はソーシャルログインユーザーでは NULL。
/// twofa_secret は AES-256-CBC で暗号化された文字列（iv:ciphertext 形式）。
/// 平文シークレットとハッシュはログ・レスポンスに出力禁止。
#[derive(Debug, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub twofa_enabled: bool,
    #[serde(skip)]
    pub twofa_secret: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
