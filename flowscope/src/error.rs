use thiserror::Error;

/// Error type for console operations against the execution service.
///
/// Malformed frames and graph entries never surface here; they are filtered
/// at the decode boundary. This covers transport failures only, which leave
/// already-accumulated state intact.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status} for {endpoint}")]
    Status { endpoint: &'static str, status: u16 },
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
