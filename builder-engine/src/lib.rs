pub mod chain_service;
pub mod client;
mod error;
pub mod jwt;
pub mod pipeline;
mod wire;

pub use chain_service::ChainService;
pub use client::EngineClient;
pub use error::Error;
pub use jwt::JwtSecret;
pub use pipeline::Pipeline;
