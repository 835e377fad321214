//! HTTP API handlers for viewval

pub mod channels;
pub mod error;
pub mod health;

pub use channels::channel_routes;
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
