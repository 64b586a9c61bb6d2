// Get-method result stack, as returned by toncenter
//
// Top level entries are `[type, value]` pairs, nested tuple elements use the
// `tvm.stackEntry*` objects.

use crate::{
    address::Address,
    cell::{Cell, CellError},
};
use serde_json::Value;
use std::{collections::VecDeque, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("get method failed with exit code {}", _0)]
    ExitCode(i64),
    #[error("no more items on the stack")]
    EndOfStack,
    #[error("expected {} on the stack, found {}", expected, found)]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid number '{}'", _0)]
    InvalidNumber(String),
    #[error("number {} does not fit in 64 bits", _0)]
    NumberOverflow(i128),
    #[error("malformed stack entry: {}", _0)]
    Malformed(String),
    #[error(transparent)]
    Cell(#[from] CellError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackItem {
    Null,
    Int(i128),
    Cell(Arc<Cell>),
    Slice(Arc<Cell>),
    Builder(Arc<Cell>),
    Tuple(Vec<StackItem>),
}

impl StackItem {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Cell(_) => "cell",
            Self::Slice(_) => "slice",
            Self::Builder(_) => "builder",
            Self::Tuple(_) => "tuple",
        }
    }
}

// Parse "0x1e", "-0x1e" or a decimal string
fn parse_number(value: &str) -> Result<i128, StackError> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|_| StackError::InvalidNumber(value.to_owned()))?;
    Ok(if negative { -parsed } else { parsed })
}

fn parse_boc_field(value: &Value, field: &str) -> Result<Arc<Cell>, StackError> {
    let bytes = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| StackError::Malformed(format!("missing '{}' field", field)))?;
    Ok(Arc::new(Cell::from_boc_base64(bytes)?))
}

fn parse_elements(value: &Value, field: &str) -> Result<Vec<StackItem>, StackError> {
    value
        .get(field)
        .and_then(|v| v.get("elements"))
        .and_then(Value::as_array)
        .ok_or_else(|| StackError::Malformed(format!("missing '{}' elements", field)))?
        .iter()
        .map(parse_tvm_entry)
        .collect()
}

// Nested `tvm.stackEntry*` object
fn parse_tvm_entry(value: &Value) -> Result<StackItem, StackError> {
    let kind = value
        .get("@type")
        .and_then(Value::as_str)
        .ok_or_else(|| StackError::Malformed(value.to_string()))?;
    match kind {
        "tvm.stackEntryNumber" => {
            let number = value
                .get("number")
                .and_then(|n| n.get("number"))
                .and_then(Value::as_str)
                .ok_or_else(|| StackError::Malformed(value.to_string()))?;
            Ok(StackItem::Int(parse_number(number)?))
        }
        "tvm.stackEntryCell" => Ok(StackItem::Cell(parse_boc_field(&value["cell"], "bytes")?)),
        "tvm.stackEntrySlice" => Ok(StackItem::Slice(parse_boc_field(&value["slice"], "bytes")?)),
        "tvm.stackEntryTuple" => Ok(StackItem::Tuple(parse_elements(value, "tuple")?)),
        "tvm.stackEntryList" => Ok(StackItem::Tuple(parse_elements(value, "list")?)),
        "tvm.stackEntryNull" => Ok(StackItem::Null),
        other => Err(StackError::Malformed(format!("unknown entry type {}", other))),
    }
}

// Top level `[type, value]` pair
pub fn parse_stack_entry(entry: &Value) -> Result<StackItem, StackError> {
    let pair = entry
        .as_array()
        .ok_or_else(|| StackError::Malformed(entry.to_string()))?;
    let kind = pair
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| StackError::Malformed(entry.to_string()))?;
    let value = pair.get(1).unwrap_or(&Value::Null);

    match kind {
        "num" => {
            let number = value
                .as_str()
                .ok_or_else(|| StackError::Malformed(entry.to_string()))?;
            Ok(StackItem::Int(parse_number(number)?))
        }
        "null" => Ok(StackItem::Null),
        "cell" => Ok(StackItem::Cell(parse_boc_field(value, "bytes")?)),
        "slice" => Ok(StackItem::Slice(parse_boc_field(value, "bytes")?)),
        "builder" => Ok(StackItem::Builder(parse_boc_field(value, "bytes")?)),
        "tuple" | "list" => Ok(StackItem::Tuple(
            value
                .get("elements")
                .and_then(Value::as_array)
                .ok_or_else(|| StackError::Malformed(entry.to_string()))?
                .iter()
                .map(parse_tvm_entry)
                .collect::<Result<_, _>>()?,
        )),
        other => Err(StackError::Malformed(format!("unknown entry type {}", other))),
    }
}

// Sequential reader over the stack returned by a get method
#[derive(Debug, Clone, Default)]
pub struct TupleReader {
    items: VecDeque<StackItem>,
}

impl TupleReader {
    pub fn new(items: Vec<StackItem>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn from_toncenter(stack: &[Value]) -> Result<Self, StackError> {
        let items = stack
            .iter()
            .map(parse_stack_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(items))
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    pub fn pop(&mut self) -> Result<StackItem, StackError> {
        self.items.pop_front().ok_or(StackError::EndOfStack)
    }

    pub fn read_big_number(&mut self) -> Result<i128, StackError> {
        match self.pop()? {
            StackItem::Int(value) => Ok(value),
            other => Err(StackError::UnexpectedType {
                expected: "int",
                found: other.kind(),
            }),
        }
    }

    pub fn read_number(&mut self) -> Result<i64, StackError> {
        let value = self.read_big_number()?;
        i64::try_from(value).map_err(|_| StackError::NumberOverflow(value))
    }

    pub fn read_boolean(&mut self) -> Result<bool, StackError> {
        Ok(self.read_big_number()? != 0)
    }

    pub fn read_cell(&mut self) -> Result<Arc<Cell>, StackError> {
        match self.pop()? {
            StackItem::Cell(cell) | StackItem::Slice(cell) | StackItem::Builder(cell) => Ok(cell),
            other => Err(StackError::UnexpectedType {
                expected: "cell",
                found: other.kind(),
            }),
        }
    }

    pub fn read_address(&mut self) -> Result<Address, StackError> {
        let cell = self.read_cell()?;
        Ok(cell.parse().load_address()?)
    }

    pub fn read_address_opt(&mut self) -> Result<Option<Address>, StackError> {
        match self.items.front() {
            Some(StackItem::Null) => {
                self.pop()?;
                Ok(None)
            }
            _ => {
                let cell = self.read_cell()?;
                Ok(cell.parse().load_maybe_address()?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OWNER_BOC: &str = "te6cckEBAQEAJAAAQ4AS5CzvnVj4s0uOzBeqQC/sZKX8ay4itoyJqW4YWTt2TbCFxPcI";
    const SENDER_BOC: &str = "te6cckEBAQEAJAAAQ4AA4ODg4ODg4ODg4ODg4ODg4ODg4ODg4ODg4ODg4ODg4PCx01ki";

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_number("0x1e").unwrap(), 30);
        assert_eq!(parse_number("-0x1").unwrap(), -1);
        assert_eq!(parse_number("42").unwrap(), 42);
        assert!(parse_number("0xzz").is_err());
    }

    #[test]
    fn test_read_addresses_in_order() {
        let stack = vec![
            json!(["slice", { "bytes": SENDER_BOC }]),
            json!(["cell", { "bytes": OWNER_BOC, "object": {} }]),
        ];
        let mut reader = TupleReader::from_toncenter(&stack).unwrap();
        let first = reader.read_address().unwrap();
        let second = reader.read_address().unwrap();
        assert_eq!(first, Address::new(0, [7u8; 32]));
        assert_eq!(
            second.to_raw_string(),
            "0:9721677ceac7c59a5c7660bd52017f63252fe3597115b4644d4b70c2c9dbb26d"
        );
        assert_eq!(reader.read_address(), Err(StackError::EndOfStack));
    }

    #[test]
    fn test_type_mismatch() {
        let mut reader = TupleReader::from_toncenter(&[json!(["num", "0x5"])]).unwrap();
        assert_eq!(
            reader.read_cell(),
            Err(StackError::UnexpectedType {
                expected: "cell",
                found: "int"
            })
        );
    }

    #[test]
    fn test_number_overflow() {
        let mut reader = TupleReader::new(vec![StackItem::Int(i128::from(i64::MAX) + 1)]);
        assert!(matches!(
            reader.read_number(),
            Err(StackError::NumberOverflow(_))
        ));
    }

    #[test]
    fn test_nested_tuple() {
        let entry = json!(["tuple", { "@type": "tvm.tuple", "elements": [
            { "@type": "tvm.stackEntryNumber", "number": { "@type": "tvm.numberDecimal", "number": "7" } },
            { "@type": "tvm.stackEntryNull" }
        ]}]);
        assert_eq!(
            parse_stack_entry(&entry).unwrap(),
            StackItem::Tuple(vec![StackItem::Int(7), StackItem::Null])
        );
    }

    #[test]
    fn test_null_address() {
        let mut reader = TupleReader::new(vec![StackItem::Null]);
        assert_eq!(reader.read_address_opt().unwrap(), None);
    }
}
