/// Authentication service and token-validation client

pub mod client;
pub mod service;

pub use client::{HttpAuthClient, LocalAuthClient, TokenValidator};
pub use service::{AuthService, TokenConfig};
