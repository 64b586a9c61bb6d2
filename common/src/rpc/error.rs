use serde_json::Error as SerdeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[cfg(feature = "rpc-client")]
    #[error("HTTP error: {}", _0)]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {}: {}", status, body)]
    Status { status: u16, body: String },
    #[error("RPC error {}: {}", code, message)]
    Server { code: i64, message: String },
    #[error("No result in response")]
    NoResult,
    #[error("Invalid JSON: {}", _0)]
    Json(#[from] SerdeError),
}

impl RpcError {
    // Code of the error as reported by the server or the HTTP layer
    pub fn get_code(&self) -> Option<i64> {
        match self {
            Self::Status { status, .. } => Some(*status as i64),
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}
