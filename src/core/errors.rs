use serde::ser::SerializeStruct;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("fetch failed for {url}: {detail}")]
    Fetch { url: String, detail: String },
    #[error("fetch timed out for {0}")]
    FetchTimeout(String),
    #[error("unexpected status {status} fetching {url}")]
    FetchStatus { url: String, status: u16 },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Fetch { .. } => "FETCH_ERROR",
            Self::FetchTimeout(_) => "FETCH_TIMEOUT",
            Self::FetchStatus { .. } => "FETCH_STATUS",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::FetchTimeout(_) => true,
            Self::FetchStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
