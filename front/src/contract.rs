// Binding of the Tonnerre counter contract
//
// Storage: id:uint32 counter:uint32 address:MsgAddress owner_address:MsgAddress
// Every operation goes through a ContractProvider bound to the contract address.

use crate::{
    provider::{ContractProvider, InternalMessage, ProviderError},
    sender::{SendMode, Sender},
};
use log::trace;
use std::sync::Arc;
use tonnerre_common::{
    address::Address,
    cell::{Cell, CellBuilder, CellError},
    state_init::StateInit,
};

pub struct Opcodes;

impl Opcodes {
    pub const INCREASE: u32 = 0x7e8764ef;
    pub const STORE: u32 = 0x5904baf6;
    pub const DEPOSIT: u32 = 0xf9471134;
    pub const WITHDRAW: u32 = 0xcb03bfaf;
}

// Get methods exposed by the contract
pub const GET_STORAGE_DATA: &str = "get_contract_storage_data";
pub const GET_COUNTER: &str = "get_counter";
pub const GET_ID: &str = "get_id";
pub const GET_BALANCE: &str = "balance";

// Initial storage of a contract to deploy
#[derive(Debug, Clone)]
pub struct TonnerreConfig {
    pub id: u32,
    pub counter: u32,
    pub address: Address,
    pub owner_address: Address,
    pub code: Cell,
}

pub fn config_to_cell(config: &TonnerreConfig) -> Result<Cell, CellError> {
    CellBuilder::new()
        .store_uint(config.id as u64, 32)?
        .store_uint(config.counter as u64, 32)?
        .store_address(Some(&config.address))?
        .store_address(Some(&config.owner_address))?
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncreaseOptions {
    pub increase_by: u32,
    pub value: u128,
    pub query_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractData {
    pub recent_sender: Address,
    pub owner_address: Address,
}

// Message bodies

pub fn deploy_body() -> Cell {
    Cell::empty()
}

fn op_body(op: u32) -> Result<Cell, CellError> {
    CellBuilder::new()
        .store_uint(op as u64, 32)?
        .store_uint(0, 64)?
        .build()
}

pub fn deposit_body() -> Result<Cell, CellError> {
    op_body(Opcodes::DEPOSIT)
}

// Plain transfer, no opcode
pub fn no_code_deposit_body() -> Result<Cell, CellError> {
    op_body(0)
}

pub fn withdrawal_body(amount: u128) -> Result<Cell, CellError> {
    CellBuilder::new()
        .store_uint(Opcodes::WITHDRAW as u64, 32)?
        .store_uint(0, 64)?
        .store_coins(amount)?
        .build()
}

pub fn increase_body(opts: &IncreaseOptions) -> Result<Cell, CellError> {
    CellBuilder::new()
        .store_uint(Opcodes::INCREASE as u64, 32)?
        .store_uint(opts.query_id.unwrap_or(0), 64)?
        .store_uint(opts.increase_by as u64, 32)?
        .build()
}

pub fn store_body() -> Result<Cell, CellError> {
    op_body(Opcodes::STORE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonnerreContract {
    address: Address,
    init: Option<StateInit>,
}

impl TonnerreContract {
    pub fn create_from_address(address: Address) -> Self {
        Self {
            address,
            init: None,
        }
    }

    pub fn create_from_config(config: &TonnerreConfig, workchain: i8) -> Result<Self, CellError> {
        let data = config_to_cell(config)?;
        let init = StateInit::new(config.code.clone(), data);
        Ok(Self {
            address: init.contract_address(workchain)?,
            init: Some(init),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn init(&self) -> Option<&StateInit> {
        self.init.as_ref()
    }

    async fn send(
        &self,
        provider: &dyn ContractProvider,
        via: &dyn Sender,
        value: u128,
        body: Cell,
    ) -> Result<(), ProviderError> {
        provider
            .internal(
                via,
                InternalMessage {
                    value,
                    bounce: None,
                    send_mode: SendMode::PAY_GAS_SEPARATELY,
                    body,
                },
            )
            .await
    }

    pub async fn send_deploy(
        &self,
        provider: &dyn ContractProvider,
        via: &dyn Sender,
        value: u128,
    ) -> Result<(), ProviderError> {
        self.send(provider, via, value, deploy_body()).await
    }

    pub async fn send_deposit(
        &self,
        provider: &dyn ContractProvider,
        via: &dyn Sender,
        value: u128,
    ) -> Result<(), ProviderError> {
        self.send(provider, via, value, deposit_body()?).await
    }

    pub async fn send_no_code_deposit(
        &self,
        provider: &dyn ContractProvider,
        via: &dyn Sender,
        value: u128,
    ) -> Result<(), ProviderError> {
        self.send(provider, via, value, no_code_deposit_body()?)
            .await
    }

    pub async fn send_withdrawal_request(
        &self,
        provider: &dyn ContractProvider,
        via: &dyn Sender,
        value: u128,
        amount: u128,
    ) -> Result<(), ProviderError> {
        self.send(provider, via, value, withdrawal_body(amount)?)
            .await
    }

    pub async fn send_increase(
        &self,
        provider: &dyn ContractProvider,
        via: &dyn Sender,
        opts: IncreaseOptions,
    ) -> Result<(), ProviderError> {
        self.send(provider, via, opts.value, increase_body(&opts)?)
            .await
    }

    pub async fn send_store(
        &self,
        provider: &dyn ContractProvider,
        via: &dyn Sender,
        value: u128,
    ) -> Result<(), ProviderError> {
        self.send(provider, via, value, store_body()?).await
    }

    pub async fn get_data(
        &self,
        provider: &dyn ContractProvider,
    ) -> Result<ContractData, ProviderError> {
        let mut stack = provider.get(GET_STORAGE_DATA).await?;
        let recent_sender = stack.read_address()?;
        let owner_address = stack.read_address()?;
        Ok(ContractData {
            recent_sender,
            owner_address,
        })
    }

    pub async fn get_counter(&self, provider: &dyn ContractProvider) -> Result<i64, ProviderError> {
        let mut stack = provider.get(GET_COUNTER).await?;
        Ok(stack.read_number()?)
    }

    pub async fn get_id(&self, provider: &dyn ContractProvider) -> Result<i64, ProviderError> {
        let mut stack = provider.get(GET_ID).await?;
        Ok(stack.read_number()?)
    }

    pub async fn get_balance(&self, provider: &dyn ContractProvider) -> Result<i64, ProviderError> {
        let mut stack = provider.get(GET_BALANCE).await?;
        Ok(stack.read_number()?)
    }
}

// A contract together with the provider it talks through
#[derive(Clone)]
pub struct OpenedContract {
    contract: TonnerreContract,
    provider: Arc<dyn ContractProvider>,
}

impl OpenedContract {
    pub fn new(contract: TonnerreContract, provider: Arc<dyn ContractProvider>) -> Self {
        if log::log_enabled!(log::Level::Trace) {
            trace!("Opening contract {}", contract.address());
        }
        Self { contract, provider }
    }

    pub fn contract(&self) -> &TonnerreContract {
        &self.contract
    }

    pub fn address(&self) -> &Address {
        self.contract.address()
    }

    pub fn init(&self) -> Option<&StateInit> {
        self.contract.init()
    }

    pub async fn send_deploy(&self, via: &dyn Sender, value: u128) -> Result<(), ProviderError> {
        self.contract
            .send_deploy(self.provider.as_ref(), via, value)
            .await
    }

    pub async fn send_deposit(&self, via: &dyn Sender, value: u128) -> Result<(), ProviderError> {
        self.contract
            .send_deposit(self.provider.as_ref(), via, value)
            .await
    }

    pub async fn send_no_code_deposit(
        &self,
        via: &dyn Sender,
        value: u128,
    ) -> Result<(), ProviderError> {
        self.contract
            .send_no_code_deposit(self.provider.as_ref(), via, value)
            .await
    }

    pub async fn send_withdrawal_request(
        &self,
        via: &dyn Sender,
        value: u128,
        amount: u128,
    ) -> Result<(), ProviderError> {
        self.contract
            .send_withdrawal_request(self.provider.as_ref(), via, value, amount)
            .await
    }

    pub async fn send_increase(
        &self,
        via: &dyn Sender,
        opts: IncreaseOptions,
    ) -> Result<(), ProviderError> {
        self.contract
            .send_increase(self.provider.as_ref(), via, opts)
            .await
    }

    pub async fn send_store(&self, via: &dyn Sender, value: u128) -> Result<(), ProviderError> {
        self.contract
            .send_store(self.provider.as_ref(), via, value)
            .await
    }

    pub async fn get_data(&self) -> Result<ContractData, ProviderError> {
        self.contract.get_data(self.provider.as_ref()).await
    }

    pub async fn get_counter(&self) -> Result<i64, ProviderError> {
        self.contract.get_counter(self.provider.as_ref()).await
    }

    pub async fn get_id(&self) -> Result<i64, ProviderError> {
        self.contract.get_id(self.provider.as_ref()).await
    }

    pub async fn get_balance(&self) -> Result<i64, ProviderError> {
        self.contract.get_balance(self.provider.as_ref()).await
    }
}
