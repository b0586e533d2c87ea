use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("{0}")]
    InvalidInput(String),

    /// Non-2xx answer from the API, with its machine code when the body had one.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn code(&self) -> &str {
        match self {
            ClientError::InvalidInput(_) => "invalid_input",
            ClientError::Api { code, .. } => code,
            ClientError::Network(_) => "network",
            ClientError::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
