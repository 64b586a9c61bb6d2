use crate::{
    sender::{SendMode, Sender, SenderArguments, SenderError},
    toncenter_api::ToncenterAPI,
};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use thiserror::Error;
use tonnerre_common::{
    address::Address,
    api::{StackError, TupleReader},
    cell::{Cell, CellError},
    rpc::RpcError,
    state_init::StateInit,
};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error(transparent)]
    Sender(#[from] SenderError),
    #[error(transparent)]
    Cell(#[from] CellError),
}

// Internal message sent to the contract the provider is bound to
#[derive(Debug, Clone)]
pub struct InternalMessage {
    pub value: u128,
    // Bounce enabled when not set
    pub bounce: Option<bool>,
    pub send_mode: SendMode,
    pub body: Cell,
}

// Chain access for a single contract
#[async_trait]
pub trait ContractProvider: Send + Sync {
    async fn get(&self, method: &str) -> Result<TupleReader, ProviderError>;

    async fn internal(&self, via: &dyn Sender, message: InternalMessage)
        -> Result<(), ProviderError>;
}

// Builds providers for contracts, see ToncenterAPI
pub trait ContractClient: Send + Sync {
    fn provider(&self, address: Address, init: Option<StateInit>) -> Arc<dyn ContractProvider>;
}

pub struct RpcProvider {
    api: Arc<ToncenterAPI>,
    address: Address,
    init: Option<StateInit>,
}

impl RpcProvider {
    pub fn new(api: Arc<ToncenterAPI>, address: Address, init: Option<StateInit>) -> Self {
        Self { api, address, init }
    }
}

#[async_trait]
impl ContractProvider for RpcProvider {
    async fn get(&self, method: &str) -> Result<TupleReader, ProviderError> {
        let result = self.api.run_get_method(&self.address, method).await?;
        Ok(result.into_reader()?)
    }

    async fn internal(
        &self,
        via: &dyn Sender,
        message: InternalMessage,
    ) -> Result<(), ProviderError> {
        // state init only goes along while the contract is not deployed
        let init = match self.init.as_ref() {
            Some(init) => {
                let state = self.api.get_address_state(&self.address).await?;
                if state.is_active() {
                    None
                } else {
                    debug!("Contract {} is {:?}, attaching state init", self.address, state);
                    Some(init.clone())
                }
            }
            None => None,
        };

        via.send(SenderArguments {
            to: self.address,
            value: message.value,
            bounce: message.bounce.unwrap_or(true),
            send_mode: message.send_mode,
            init,
            body: Some(message.body),
        })
        .await?;
        Ok(())
    }
}

impl ContractClient for Arc<ToncenterAPI> {
    fn provider(&self, address: Address, init: Option<StateInit>) -> Arc<dyn ContractProvider> {
        Arc::new(RpcProvider::new(Arc::clone(self), address, init))
    }
}
