pub mod health;
pub mod login;
pub mod register;
pub mod two_factor;

pub use health::health_check;
pub use login::{login, refresh_access_token};
pub use register::register;
pub use two_factor::{enable_2fa, verify_2fa_login, verify_2fa_setup};
