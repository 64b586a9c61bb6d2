// toncenter v2 API types

mod stack;

pub use stack::*;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;

#[derive(Serialize, Deserialize)]
pub struct AddressParams<'a> {
    pub address: Cow<'a, str>,
}

#[derive(Serialize, Deserialize)]
pub struct RunGetMethodParams<'a> {
    pub address: Cow<'a, str>,
    pub method: Cow<'a, str>,
    // Get methods of this contract take no arguments
    pub stack: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunGetMethodResult {
    #[serde(default)]
    pub gas_used: Option<i64>,
    pub stack: Vec<Value>,
    pub exit_code: i64,
}

impl RunGetMethodResult {
    // TVM exit codes 0 and 1 are both successful executions
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 || self.exit_code == 1
    }

    pub fn into_reader(self) -> Result<TupleReader, StackError> {
        if !self.is_success() {
            return Err(StackError::ExitCode(self.exit_code));
        }
        TupleReader::from_toncenter(&self.stack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressState {
    Active,
    Uninitialized,
    Frozen,
}

impl AddressState {
    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockIdExt {
    pub workchain: i32,
    pub shard: String,
    pub seqno: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterchainInfo {
    pub last: BlockIdExt,
}

// Balances are sent as decimal strings
pub fn deserialize_string_amount<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<u128, D::Error> {
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => s.parse().map_err(Error::custom),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| Error::custom("invalid amount")),
        other => Err(Error::custom(format!("invalid amount: {}", other))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBalance(pub u128);

impl<'de> Deserialize<'de> for AddressBalance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_string_amount(deserializer).map(Self)
    }
}
