use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unknown appointment status: {0}")]
    UnknownStatus(String),

    #[error("Unknown read state: {0}")]
    UnknownReadState(String),

    #[error("Invalid date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid time '{value}': {source}")]
    InvalidTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),
}
