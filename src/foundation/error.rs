pub type StagemixResult<T> = Result<T, StagemixError>;

#[derive(thiserror::Error, Debug)]
pub enum StagemixError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("lookup error: {0}")]
    Lookup(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagemixError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }
}
