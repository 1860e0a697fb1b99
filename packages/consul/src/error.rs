use kvfs_core::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request canceled")]
    Canceled,

    #[error("Request worker exited without a response")]
    WorkerGone,

    #[error("Filesystem error: {0}")]
    Fs(#[from] kvfs_core::Error),
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        match error {
            Error::Canceled => StoreError::Canceled,
            Error::Status { status, message } => StoreError::Status {
                code: status,
                message,
            },
            Error::Json(e) => StoreError::Decode {
                message: e.to_string(),
            },
            other => StoreError::Transport(Box::new(other)),
        }
    }
}
