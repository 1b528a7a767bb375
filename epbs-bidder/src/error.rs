use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Core(#[from] builder_core::Error),
    #[error("{0}")]
    Consensus(#[from] ethereum_consensus::Error),
    #[error("http error submitting to the consensus client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reveal rejected by the consensus client: {0}")]
    RevealRejected(String),
}
