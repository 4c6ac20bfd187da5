use valist_types::TxHash;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The ledger refused to accept the transaction into its pool.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// The transaction was mined but execution was rejected.
    #[error("transaction {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: TxHash, reason: String },

    /// The wait for inclusion ended before a receipt appeared.
    #[error("confirmation of {tx_hash} timed out")]
    ConfirmationTimeout { tx_hash: TxHash },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl LedgerError {
    /// Whether the same request may succeed if repeated unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
