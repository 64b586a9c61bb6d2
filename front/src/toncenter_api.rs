use log::trace;
use std::{borrow::Cow, time::Duration};
use tonnerre_common::{
    address::Address,
    api::*,
    rpc::client::{JsonRPCClient, JsonRPCResult},
};

// Typed access to the toncenter v2 JSON-RPC endpoint
pub struct ToncenterAPI {
    client: JsonRPCClient,
}

impl ToncenterAPI {
    pub fn new<S: ToString>(endpoint: S) -> JsonRPCResult<Self> {
        Ok(Self {
            client: JsonRPCClient::new(endpoint)?,
        })
    }

    pub fn with<S: ToString>(
        endpoint: S,
        timeout: Duration,
        api_key: Option<&str>,
    ) -> JsonRPCResult<Self> {
        Ok(Self {
            client: JsonRPCClient::with(endpoint, timeout, api_key)?,
        })
    }

    pub fn get_client(&self) -> &JsonRPCClient {
        &self.client
    }

    pub fn get_endpoint(&self) -> &str {
        self.client.get_target()
    }

    pub async fn run_get_method(
        &self,
        address: &Address,
        method: &str,
    ) -> JsonRPCResult<RunGetMethodResult> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("run_get_method {} on {}", method, address);
        }
        self.client
            .call_with(
                "runGetMethod",
                &RunGetMethodParams {
                    address: Cow::Owned(address.to_string()),
                    method: Cow::Borrowed(method),
                    stack: Vec::new(),
                },
            )
            .await
    }

    pub async fn get_address_state(&self, address: &Address) -> JsonRPCResult<AddressState> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get_address_state {}", address);
        }
        self.client
            .call_with(
                "getAddressState",
                &AddressParams {
                    address: Cow::Owned(address.to_string()),
                },
            )
            .await
    }

    pub async fn get_address_balance(&self, address: &Address) -> JsonRPCResult<u128> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get_address_balance {}", address);
        }
        let balance: AddressBalance = self
            .client
            .call_with(
                "getAddressBalance",
                &AddressParams {
                    address: Cow::Owned(address.to_string()),
                },
            )
            .await?;
        Ok(balance.0)
    }

    pub async fn get_masterchain_info(&self) -> JsonRPCResult<MasterchainInfo> {
        trace!("get_masterchain_info");
        self.client.call("getMasterchainInfo").await
    }
}
