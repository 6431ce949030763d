use agora_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("credential does not resolve to a known agent")]
    UnknownCredential,

    #[error("identity service request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from identity service: {0}")]
    InvalidResponse(String),

    #[error("identity service unreachable: {0}")]
    Unreachable(String),

    #[error("identity client setup failed: {0}")]
    ClientSetup(String),

    #[error("discovery log read failed: {0}")]
    Ledger(#[from] LedgerError),
}
