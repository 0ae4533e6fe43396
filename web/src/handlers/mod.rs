//! HTTP request handlers shared by order-stream services.

pub mod health;

pub use health::{health_check, readiness_check};
