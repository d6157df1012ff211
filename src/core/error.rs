use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("please fill in {field}")]
    MissingInput { field: &'static str },
    #[error("minimum withdrawal is R {minimum:.0}")]
    BelowMinimum { minimum: f64 },
    #[error("maximum withdrawal is R {limit:.0} (10% of your savings pot)")]
    ExceedsLimit { limit: f64 },
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read tax table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tax table JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tax table {label:?}: {reason}")]
    Invalid { label: String, reason: String },
}
