mod auth;
mod health_check;

pub use auth::{change_password, get_current_user, login, logout, register};
pub use health_check::health_check;
