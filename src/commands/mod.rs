pub mod app_info;
pub mod coin;
pub mod health;
pub mod session;
