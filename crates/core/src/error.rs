#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("No leading decimal digits in input: {0:?}")]
    NoDigits(String),

    #[error("Invalid event id: {0:?}")]
    InvalidEventId(String),
}
