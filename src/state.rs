use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::services::{SecretCipher, TokenService, TotpService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: UserRepository,
    /// トークン発行・検証サービス
    pub token_service: TokenService,
    /// TOTPサービス
    pub totp_service: TotpService,
}

impl AppState {
    /// 新しい AppState を作成
    ///
    /// 署名キーと暗号化キーはここで一度だけ展開され、
    /// 各サービスのコンストラクタに注入される。
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let user_repo = UserRepository::new(db_pool.clone());

        let token_service = TokenService::new(
            config.access_token_secret.expose_secret(),
            config.refresh_token_secret.expose_secret(),
            config.twofa_token_secret.expose_secret(),
        );

        let cipher = SecretCipher::new(config.encryption_key.expose_secret())?;
        let totp_service = TotpService::new(config.totp_issuer.clone(), user_repo.clone(), cipher);

        Ok(Self {
            db_pool,
            config,
            user_repo,
            token_service,
            totp_service,
        })
    }
}
