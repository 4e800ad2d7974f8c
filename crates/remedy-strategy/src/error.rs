//! Error types for the strategy library

/// Strategy library errors
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// No strategy registered under this name
    #[error("unknown strategy: '{0}'")]
    UnknownStrategy(String),

    /// Action payload variant does not belong to this strategy
    #[error("payload mismatch for '{strategy}': expected {expected}")]
    PayloadMismatch {
        /// Strategy that rejected the payload
        strategy: String,
        /// Expected payload kind
        expected: &'static str,
    },

    /// Payload contents are unusable (e.g. bad regex)
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Strategy could not build a proposal for this issue
    #[error("proposal failed: {0}")]
    ProposalFailed(String),

    /// Live/sandbox apply faulted
    #[error("apply failed: {0}")]
    ApplyFailed(String),
}

impl From<regex::Error> for StrategyError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
