use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // JWT署名キー設定
    //
    // アクセス/リフレッシュ/2FA保留の3種類を別キーで署名する。
    // キーを分けることで、トークンを別用途に流用できないようにする。
    pub access_token_secret: SecretBox<String>,
    pub refresh_token_secret: SecretBox<String>,
    pub twofa_token_secret: SecretBox<String>,

    // 2FA (TOTP) 設定
    /// TOTP発行者名（認証アプリに表示される）
    #[serde(default = "default_totp_issuer")]
    pub totp_issuer: String,
    /// AES-256暗号化キー（hexエンコード、32バイト = 64文字）
    pub encryption_key: SecretBox<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOTP_ISSUER: &str = "Task Management";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_totp_issuer() -> String {
    DEFAULT_TOTP_ISSUER.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
