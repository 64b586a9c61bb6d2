use super::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSON_RPC_VERSION: &str = "2.0";

pub type Id = u64;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: Id,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P: Serialize> RpcRequest<'a, P> {
    pub fn new(id: Id, method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION,
            id,
            method,
            params,
        }
    }
}

// Error as sent by the server: either a JSON-RPC error object
// or a plain message next to an HTTP-like code (toncenter style)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RpcErrorPayload {
    Object { code: i64, message: String },
    Message(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorPayload>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(RpcErrorPayload::Object { code, message }) => {
                return Err(RpcError::Server { code, message })
            }
            Some(RpcErrorPayload::Message(message)) => {
                return Err(RpcError::Server {
                    code: self.code.unwrap_or(-1),
                    message,
                })
            }
            None => {}
        }

        if self.ok == Some(false) {
            return Err(RpcError::Server {
                code: self.code.unwrap_or(-1),
                message: "request was not successful".to_owned(),
            });
        }

        self.result.ok_or(RpcError::NoResult)
    }
}
