pub mod config;
pub mod crypto;
pub mod error;
pub mod provision;
pub mod store;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
