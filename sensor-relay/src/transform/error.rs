#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Required field `{0}` is missing from the payload")]
    MissingField(&'static str),
    #[error("Field `{field}` must be numeric, found {found}")]
    NotNumeric { field: &'static str, found: &'static str },
    #[error("Field `{field}` holds an unparsable number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Malformed sensor message: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for TransformError {
    fn from(err: serde_json::Error) -> Self {
        TransformError::Malformed(err.to_string())
    }
}
