pub mod auth;
pub mod cipher;
pub mod token;
pub mod totp;

pub use cipher::SecretCipher;
pub use token::TokenService;
pub use totp::TotpService;
