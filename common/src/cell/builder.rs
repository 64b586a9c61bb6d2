use super::{Cell, CellError, MAX_CELL_BITS, MAX_CELL_REFS};
use crate::address::Address;
use std::sync::Arc;

// Coins are serialized as VarUInteger 16: a 4 bits length in bytes then the value
pub const COINS_LENGTH_BITS: usize = 4;
pub const MAX_COINS_BYTES: usize = 15;

// Append only writer for a single cell
#[derive(Debug, Default, Clone)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn available_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    fn ensure_bits(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.available_bits() {
            return Err(CellError::BitsOverflow {
                requested: bits,
                available: self.available_bits(),
            });
        }
        Ok(())
    }

    // Caller must have checked the capacity
    fn push_bit(&mut self, bit: bool) {
        let byte = self.bit_len / 8;
        if byte == self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength { bits, max: 64 });
        }
        if bits < 64 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange {
                value: value as i128,
                bits,
            });
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    // Two's complement signed integer
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength { bits, max: 64 });
        }
        let in_range = match bits {
            0 => value == 0,
            64 => true,
            _ => {
                let bound = 1i64 << (bits - 1);
                value >= -bound && value < bound
            }
        };
        if !in_range {
            return Err(CellError::ValueOutOfRange {
                value: value as i128,
                bits,
            });
        }
        self.ensure_bits(bits)?;
        let raw = value as u64;
        for i in (0..bits).rev() {
            self.push_bit((raw >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.ensure_bits(bytes.len() * 8)?;
        for byte in bytes {
            for i in (0..8).rev() {
                self.push_bit((byte >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self, CellError> {
        let len = (128 - amount.leading_zeros() as usize).div_ceil(8);
        if len > MAX_COINS_BYTES {
            return Err(CellError::CoinsOutOfRange(amount));
        }
        self.ensure_bits(COINS_LENGTH_BITS + len * 8)?;
        self.store_uint(len as u64, COINS_LENGTH_BITS)?;
        let bytes = amount.to_be_bytes();
        self.store_bytes(&bytes[bytes.len() - len..])
    }

    // MsgAddressInt addr_std without anycast, or addr_none when absent
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self, CellError> {
        match address {
            Some(address) => {
                self.ensure_bits(Address::STD_BITS)?;
                self.store_uint(0b10, 2)?
                    .store_bit(false)?
                    .store_int(address.get_workchain() as i64, 8)?
                    .store_bytes(address.get_hash())
            }
            None => self.store_uint(0, 2),
        }
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(CellError::RefsOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    // Maybe ^Cell: a presence bit then the reference
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> Result<&mut Self, CellError> {
        match cell {
            Some(cell) => {
                if self.refs.len() >= MAX_CELL_REFS {
                    return Err(CellError::RefsOverflow);
                }
                self.store_bit(true)?.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    pub fn build(&self) -> Result<Cell, CellError> {
        Cell::from_parts(self.data.clone(), self.bit_len, self.refs.clone())
    }
}
