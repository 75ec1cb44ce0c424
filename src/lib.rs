//! Space Surfer - market-driven endless runner core

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, FeedError};
pub use services::{GameEngine, PriceFeedConnector, SessionController};
pub use types::*;
