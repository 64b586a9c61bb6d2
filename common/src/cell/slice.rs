use super::{builder::COINS_LENGTH_BITS, Cell, CellError};
use crate::address::Address;
use std::sync::Arc;

// Read cursor over a cell
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_offset: usize,
    ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_offset: 0,
            ref_offset: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_offset
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_offset
    }

    fn ensure_bits(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.remaining_bits() {
            return Err(CellError::NotEnoughBits {
                requested: bits,
                remaining: self.remaining_bits(),
            });
        }
        Ok(())
    }

    fn next_bit(&mut self) -> bool {
        let byte = self.cell.data()[self.bit_offset / 8];
        let bit = byte & (0x80 >> (self.bit_offset % 8)) != 0;
        self.bit_offset += 1;
        bit
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        self.ensure_bits(1)?;
        Ok(self.next_bit())
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength { bits, max: 64 });
        }
        self.ensure_bits(bits)?;
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | self.next_bit() as u64;
        }
        Ok(value)
    }

    pub fn load_int(&mut self, bits: usize) -> Result<i64, CellError> {
        let raw = self.load_uint(bits)?;
        if bits == 0 || bits == 64 {
            return Ok(raw as i64);
        }
        // Sign extend
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        self.ensure_bits(len * 8)?;
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            bytes.push(self.load_uint(8)? as u8);
        }
        Ok(bytes)
    }

    pub fn load_coins(&mut self) -> Result<u128, CellError> {
        let len = self.load_uint(COINS_LENGTH_BITS)? as usize;
        let bytes = self.load_bytes(len)?;
        Ok(bytes
            .into_iter()
            .fold(0u128, |acc, byte| (acc << 8) | byte as u128))
    }

    // Load an addr_none or addr_std address
    pub fn load_maybe_address(&mut self) -> Result<Option<Address>, CellError> {
        let tag = self.load_uint(2)? as u8;
        match tag {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::AnycastNotSupported);
                }
                let workchain = self.load_int(8)? as i8;
                let hash = self.load_bytes(32)?;
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&hash);
                Ok(Some(Address::new(workchain, bytes)))
            }
            tag => Err(CellError::InvalidAddressTag(tag)),
        }
    }

    pub fn load_address(&mut self) -> Result<Address, CellError> {
        self.load_maybe_address()?
            .ok_or(CellError::InvalidAddressTag(0b00))
    }

    pub fn load_ref(&mut self) -> Result<&'a Arc<Cell>, CellError> {
        let cell = self
            .cell
            .refs()
            .get(self.ref_offset)
            .ok_or(CellError::NotEnoughRefs)?;
        self.ref_offset += 1;
        Ok(cell)
    }

    pub fn load_maybe_ref(&mut self) -> Result<Option<&'a Arc<Cell>>, CellError> {
        if self.load_bit()? {
            self.load_ref().map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    #[test]
    fn test_read_back_fields() {
        let owner = Address::new(0, [7u8; 32]);
        let mut builder = CellBuilder::new();
        builder
            .store_uint(0xcb03bfaf, 32)
            .unwrap()
            .store_int(-5, 16)
            .unwrap()
            .store_coins(123_456)
            .unwrap()
            .store_address(Some(&owner))
            .unwrap()
            .store_address(None)
            .unwrap();
        let cell = builder.build().unwrap();

        let mut slice = cell.parse();
        assert_eq!(slice.load_uint(32).unwrap(), 0xcb03bfaf);
        assert_eq!(slice.load_int(16).unwrap(), -5);
        assert_eq!(slice.load_coins().unwrap(), 123_456);
        assert_eq!(slice.load_address().unwrap(), owner);
        assert_eq!(slice.load_maybe_address().unwrap(), None);
        assert_eq!(slice.remaining_bits(), 0);
    }

    #[test]
    fn test_not_enough_bits() {
        let cell = CellBuilder::new().store_uint(1, 4).unwrap().build().unwrap();
        let mut slice = cell.parse();
        assert_eq!(
            slice.load_uint(8),
            Err(CellError::NotEnoughBits {
                requested: 8,
                remaining: 4
            })
        );
        assert_eq!(slice.load_ref().err(), Some(CellError::NotEnoughRefs));
    }

    #[test]
    fn test_load_address_rejects_none() {
        let cell = CellBuilder::new()
            .store_address(None)
            .unwrap()
            .build()
            .unwrap();
        assert!(cell.parse().load_address().is_err());
    }
}
