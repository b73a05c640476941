use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaybatchError>;

#[derive(Error, Debug)]
pub enum PaybatchError {
    #[error("no embedded payload found for key '{key}'")]
    ExtractionNotFound { key: String },
    #[error("embedded payload for key '{key}' is not valid JSON: {source}")]
    ExtractionMalformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("embedded payload '{key}' has unexpected shape: {detail}")]
    PayloadShape { key: String, detail: String },
    #[error("authentication failed (status {status}): {body}")]
    AuthenticationFailed { status: u16, body: String },
    #[error("one-time passcode rejected (status {status}): {body}")]
    OtpFailed { status: u16, body: String },
    #[error("one-time passcode seed is not valid base32")]
    OtpSeedInvalid,
    #[error("reference data fetch failed (status {status})")]
    ReferenceLoadFailed { status: u16 },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
