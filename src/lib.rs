pub mod commands;
pub mod config;
pub mod fetcher;
pub mod models;
pub mod notifier;
pub mod parser;
pub mod policy;
pub mod scheduler;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::{Result, VigiaError};
