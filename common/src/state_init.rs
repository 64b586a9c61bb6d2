use crate::{
    address::Address,
    cell::{Cell, CellBuilder, CellError},
};
use std::sync::Arc;

// Base workchain used for user contracts
pub const BASE_WORKCHAIN: i8 = 0;

// Code and initial data of a contract, its hash is the contract address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    pub code: Arc<Cell>,
    pub data: Arc<Cell>,
}

impl StateInit {
    pub fn new(code: Cell, data: Cell) -> Self {
        Self {
            code: Arc::new(code),
            data: Arc::new(data),
        }
    }

    // split_depth:(Maybe) special:(Maybe) code:(Maybe ^Cell) data:(Maybe ^Cell) library:(HashmapE)
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        CellBuilder::new()
            .store_bit(false)?
            .store_bit(false)?
            .store_maybe_ref(Some(self.code.clone()))?
            .store_maybe_ref(Some(self.data.clone()))?
            .store_bit(false)?
            .build()
    }

    pub fn contract_address(&self, workchain: i8) -> Result<Address, CellError> {
        Ok(Address::new(workchain, *self.to_cell()?.hash()))
    }
}
