//! Middleware module - Authentication, rate limiting and request timing

pub mod auth;
pub mod rate_limit;
pub mod timing;

pub use auth::AuthLayer;
pub use rate_limit::RateLimitLayer;
pub use timing::TimingLayer;
