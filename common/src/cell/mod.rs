// TON cells
//
// A cell holds up to 1023 bits of data and up to 4 references to other cells.
// Cells are immutable once built: the representation hash and depth are
// computed by the builder and cached in the cell.

mod boc;
mod builder;
mod slice;

pub use boc::*;
pub use builder::*;
pub use slice::*;

use sha2::{Digest, Sha256};
use std::{
    fmt::{self, Display, Formatter},
    hash::{Hash as StdHash, Hasher},
    sync::Arc,
};
use thiserror::Error;

pub const MAX_CELL_BITS: usize = 1023;
pub const MAX_CELL_REFS: usize = 4;
pub const CELL_HASH_SIZE: usize = 32;

pub type CellHash = [u8; CELL_HASH_SIZE];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("cell overflow: {} bits requested, {} bits available", requested, available)]
    BitsOverflow { requested: usize, available: usize },
    #[error("cell cannot hold more than {} references", MAX_CELL_REFS)]
    RefsOverflow,
    #[error("value {} does not fit in {} bits", value, bits)]
    ValueOutOfRange { value: i128, bits: usize },
    #[error("cannot use more than {} bits for an integer, got {}", max, bits)]
    InvalidBitLength { bits: usize, max: usize },
    #[error("coins value {} is above the 120 bits limit", _0)]
    CoinsOutOfRange(u128),
    #[error("not enough bits: {} requested, {} remaining", requested, remaining)]
    NotEnoughBits { requested: usize, remaining: usize },
    #[error("not enough references in cell")]
    NotEnoughRefs,
    #[error("invalid address tag {:#04b}", _0)]
    InvalidAddressTag(u8),
    #[error("anycast addresses are not supported")]
    AnycastNotSupported,
    #[error("invalid bag of cells: {}", _0)]
    InvalidBoc(&'static str),
    #[error("bag of cells checksum mismatch")]
    BocChecksumMismatch,
    #[error("exotic cells are not supported")]
    ExoticCell,
}

#[derive(Clone)]
pub struct Cell {
    // Data bits, left aligned, unused trailing bits are zero
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: CellHash,
    depth: u16,
}

impl Cell {
    // Build a cell from its raw parts, checking the size limits
    pub fn from_parts(
        mut data: Vec<u8>,
        bit_len: usize,
        refs: Vec<Arc<Cell>>,
    ) -> Result<Self, CellError> {
        if bit_len > MAX_CELL_BITS {
            return Err(CellError::BitsOverflow {
                requested: bit_len,
                available: MAX_CELL_BITS,
            });
        }
        if refs.len() > MAX_CELL_REFS {
            return Err(CellError::RefsOverflow);
        }

        let bytes = bit_len.div_ceil(8);
        if data.len() < bytes {
            return Err(CellError::NotEnoughBits {
                requested: bit_len,
                remaining: data.len() * 8,
            });
        }
        data.truncate(bytes);
        if bit_len % 8 != 0 {
            let last = bytes - 1;
            data[last] &= 0xff << (8 - bit_len % 8);
        }

        let depth = refs
            .iter()
            .map(|r| r.depth + 1)
            .max()
            .unwrap_or(0);
        let hash = representation_hash(&data, bit_len, &refs);

        Ok(Self {
            data,
            bit_len,
            refs,
            hash,
            depth,
        })
    }

    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
            refs: Vec::new(),
            hash: representation_hash(&[], 0, &[]),
            depth: 0,
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn hash(&self) -> &CellHash {
        &self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs.is_empty()
    }

    // Start reading the cell from its first bit
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    // Descriptor bytes d1 and d2 of an ordinary cell of level 0
    fn descriptors(&self) -> [u8; 2] {
        descriptors(self.bit_len, self.refs.len())
    }

    // Data padded with the completion tag when not byte aligned
    fn padded_data(&self) -> Vec<u8> {
        padded_data(&self.data, self.bit_len)
    }
}

fn descriptors(bit_len: usize, refs: usize) -> [u8; 2] {
    let d1 = refs as u8;
    let d2 = (bit_len / 8 + bit_len.div_ceil(8)) as u8;
    [d1, d2]
}

fn padded_data(data: &[u8], bit_len: usize) -> Vec<u8> {
    let mut padded = data.to_vec();
    if bit_len % 8 != 0 {
        let last = padded.len() - 1;
        padded[last] |= 0x80 >> (bit_len % 8);
    }
    padded
}

fn representation_hash(data: &[u8], bit_len: usize, refs: &[Arc<Cell>]) -> CellHash {
    let mut hasher = Sha256::new();
    hasher.update(descriptors(bit_len, refs.len()));
    hasher.update(padded_data(data, bit_len));
    for r in refs {
        hasher.update(r.depth.to_be_bytes());
    }
    for r in refs {
        hasher.update(r.hash);
    }
    hasher.finalize().into()
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl StdHash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

// Fift-like representation: x{HEX} with a `_` suffix when the bits
// are not nibble aligned, followed by the references indented
impl Cell {
    fn fmt_indented(&self, f: &mut Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{:indent$}x{{{}}}", "", self.hex_bits(), indent = indent)?;
        for r in &self.refs {
            writeln!(f)?;
            r.fmt_indented(f, indent + 1)?;
        }
        Ok(())
    }

    fn hex_bits(&self) -> String {
        let nibbles = self.bit_len.div_ceil(4);
        let aligned = self.bit_len % 4 == 0;
        let mut data = self.data.clone();
        if !aligned {
            // Completion tag inside the last nibble
            let byte = self.bit_len / 8;
            if byte >= data.len() {
                data.push(0);
            }
            data[byte] |= 0x80 >> (self.bit_len % 8);
        }

        let mut out = hex::encode(&data);
        out.truncate(nibbles);
        if !aligned {
            out.push('_');
        }
        out.to_uppercase()
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Cell[{}]({})", hex::encode(self.hash), self.hex_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_hash() {
        assert_eq!(
            hex::encode(Cell::empty().hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert!(Cell::empty().is_empty());
        assert_eq!(Cell::empty().depth(), 0);
    }

    #[test]
    fn test_unaligned_bits_are_masked() {
        let cell = Cell::from_parts(vec![0xff], 3, Vec::new()).unwrap();
        assert_eq!(cell.data(), &[0xe0]);
        assert_eq!(cell.to_string(), "x{F_}");
    }

    #[test]
    fn test_depth_follows_refs() {
        let leaf = Arc::new(Cell::empty());
        let mid = Arc::new(Cell::from_parts(Vec::new(), 0, vec![leaf.clone()]).unwrap());
        let root = Cell::from_parts(Vec::new(), 0, vec![leaf, mid]).unwrap();
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_too_many_refs() {
        let refs = (0..5).map(|_| Arc::new(Cell::empty())).collect();
        assert_eq!(
            Cell::from_parts(Vec::new(), 0, refs),
            Err(CellError::RefsOverflow)
        );
    }
}
