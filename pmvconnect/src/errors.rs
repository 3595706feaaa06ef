use thiserror::Error;

/// Remote call failure taxonomy.
///
/// Every variant means the triggering operation failed outright; callers
/// never receive partial results alongside one of these.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("host {host} is offline or uncontactable: {message}")]
    Offline { host: String, message: String },

    #[error("401 Unauthorized from {host}; check the account token")]
    Unauthorized { host: String },

    #[error("unexpected status {status} for '{path}' on {host}")]
    InvalidResponse {
        host: String,
        path: String,
        status: u16,
    },

    #[error("invalid XML payload for '{path}': {message}")]
    InvalidPayload { path: String, message: String },
}
