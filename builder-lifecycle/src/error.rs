use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Core(#[from] builder_core::Error),
    #[error("{0}")]
    Consensus(#[from] ethereum_consensus::Error),
    #[error("{0}")]
    Engine(#[from] builder_engine::Error),
    #[error("{0}")]
    Wallet(#[from] builder_core::wallet::Error),
    #[error("deposit transaction was never confirmed within the timeout")]
    DepositTimedOut,
    #[error("deposit transaction reverted")]
    DepositReverted,
}
