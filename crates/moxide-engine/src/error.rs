use thiserror::Error;

/// Fatal conditions of a verification run. None of these are recovered
/// from: the outer driver inspects the error once and aborts.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("unsupported model-checking algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("unsupported solver backend '{0}'")]
    UnsupportedBackend(String),

    /// The decision procedure failed or is unavailable. A failed
    /// satisfiability answer cannot be soundly substituted with a guess,
    /// so there is no retry.
    #[error("oracle failure: {0}")]
    Oracle(Box<dyn std::error::Error + Send + Sync>),

    /// The oracle answered neither sat nor unsat.
    #[error("oracle returned unknown: {0}")]
    OracleUnknown(String),

    /// A satisfying model did not bind a state variable to a concrete
    /// value, so no cube can be built from it.
    #[error("model is missing a value for state variable '{0}'")]
    MissingModelValue(String),

    /// The configured deadline expired before a verdict was reached.
    /// Distinct from non-termination, which is not an error.
    #[error("verification cancelled: deadline expired before a verdict")]
    Cancelled,
}

impl CheckError {
    pub fn oracle<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CheckError::Oracle(Box::new(err))
    }
}
