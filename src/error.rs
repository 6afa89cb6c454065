use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Required column '{0}' not found in header")]
    MissingColumn(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("No usable vote records: {0}")]
    EmptyData(String),

    #[error("Dimensionality reduction failed: {0}")]
    Reduction(String),
}

impl From<linfa_reduction::ReductionError> for Error {
    fn from(e: linfa_reduction::ReductionError) -> Self {
        Error::Reduction(e.to_string())
    }
}

impl From<linfa_tsne::TSneError> for Error {
    fn from(e: linfa_tsne::TSneError) -> Self {
        Error::Reduction(e.to_string())
    }
}
