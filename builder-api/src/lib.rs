mod auth;
mod error;
mod server;
mod state;
mod validator_store;

pub use auth::require_token;
pub use error::Error;
pub use server::{RelayServer, Server};
pub use state::{AppState, Config};
pub use validator_store::ValidatorStore;
