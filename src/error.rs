use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Header row is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Input contains no header row")]
    EmptyInput,

    #[error("Invalid geo cluster precision {0}: must be 6 or fewer decimals")]
    InvalidClusterPrecision(u32),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
