use super::{Id, RpcError, RpcRequest, RpcResponse};
use log::trace;
use reqwest::{header::HeaderValue, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

pub type JsonRPCResult<T> = Result<T, RpcError>;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const API_KEY_HEADER: &str = "X-API-Key";

// JSON-RPC client over HTTP POST
pub struct JsonRPCClient {
    http: Client,
    target: String,
    count: AtomicU64,
}

impl JsonRPCClient {
    pub fn new<S: ToString>(target: S) -> JsonRPCResult<Self> {
        Self::with(target, DEFAULT_TIMEOUT, None)
    }

    pub fn with<S: ToString>(
        target: S,
        timeout: Duration,
        api_key: Option<&str>,
    ) -> JsonRPCResult<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(key) = api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = HeaderValue::from_str(key).map_err(|_| RpcError::Status {
                status: 0,
                body: "invalid API key".to_owned(),
            })?;
            headers.insert(API_KEY_HEADER, value);
            builder = builder.default_headers(headers);
        }

        Ok(Self {
            http: builder.build()?,
            target: target.to_string(),
            count: AtomicU64::new(0),
        })
    }

    pub fn get_target(&self) -> &str {
        &self.target
    }

    fn next_id(&self) -> Id {
        self.count.fetch_add(1, Ordering::SeqCst)
    }

    pub async fn call<R: DeserializeOwned>(&self, method: &str) -> JsonRPCResult<R> {
        self.call_with(method, &Value::Object(Default::default()))
            .await
    }

    pub async fn call_with<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> JsonRPCResult<R> {
        let id = self.next_id();
        if log::log_enabled!(log::Level::Trace) {
            trace!("Sending request #{} {} to {}", id, method, self.target);
        }

        let request = RpcRequest::new(id, method, params);
        let response = self.http.post(&self.target).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        // toncenter answers errors with a JSON body and a non 2xx status
        let parsed: RpcResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let result = parsed.into_result()?;
        if log::log_enabled!(log::Level::Trace) {
            trace!("Received response #{} for {}: {}", id, method, result);
        }
        Ok(serde_json::from_value(result)?)
    }
}

// Fetch and decode a JSON document with a plain GET request
pub async fn get_json<R: DeserializeOwned>(url: &str) -> JsonRPCResult<R> {
    if log::log_enabled!(log::Level::Trace) {
        trace!("GET {}", url);
    }
    let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
    let response = http.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RpcError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    Ok(response.json().await?)
}
