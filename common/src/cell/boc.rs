// Bag of cells serialization (generic layout, magic b5ee9c72)

use super::{Cell, CellError, CellHash, MAX_CELL_REFS};
use base64::{engine::general_purpose, Engine as _};
use std::{collections::HashMap, sync::Arc};

pub const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

const FLAG_HAS_INDEX: u8 = 0x80;
const FLAG_HAS_CRC32C: u8 = 0x40;
const SIZE_BYTES_MASK: u8 = 0x07;

// Castagnoli CRC, as used for the BoC trailer
pub fn crc32c(data: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for byte in data {
        crc ^= *byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x82f6_3b78
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

// Minimum number of bytes to encode the value, at least one
fn bytes_for(value: usize) -> usize {
    let bits = usize::BITS as usize - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn write_uint(out: &mut Vec<u8>, value: usize, bytes: usize) {
    let be = (value as u64).to_be_bytes();
    out.extend_from_slice(&be[be.len() - bytes..]);
}

// Topological order: every cell comes before the cells it references,
// identical cells are written once
fn collect_cells(root: &Cell) -> Vec<&Cell> {
    fn visit<'a>(cell: &'a Cell, seen: &mut HashMap<CellHash, ()>, post: &mut Vec<&'a Cell>) {
        if seen.insert(*cell.hash(), ()).is_some() {
            return;
        }
        for r in cell.refs() {
            visit(r, seen, post);
        }
        post.push(cell);
    }

    let mut seen = HashMap::new();
    let mut post = Vec::new();
    visit(root, &mut seen, &mut post);
    post.reverse();
    post
}

impl Cell {
    pub fn to_boc(&self, with_crc: bool) -> Vec<u8> {
        let cells = collect_cells(self);
        let indexes: HashMap<&CellHash, usize> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (cell.hash(), i))
            .collect();
        let size_bytes = bytes_for(cells.len());

        let mut body = Vec::new();
        for cell in &cells {
            body.extend_from_slice(&cell.descriptors());
            body.extend_from_slice(&cell.padded_data());
            for r in cell.refs() {
                write_uint(&mut body, indexes[r.hash()], size_bytes);
            }
        }
        let offset_bytes = bytes_for(body.len());

        let mut flags = size_bytes as u8;
        if with_crc {
            flags |= FLAG_HAS_CRC32C;
        }

        let mut out = Vec::with_capacity(body.len() + 32);
        out.extend_from_slice(&BOC_MAGIC);
        out.push(flags);
        out.push(offset_bytes as u8);
        write_uint(&mut out, cells.len(), size_bytes);
        // one root, no absent cells
        write_uint(&mut out, 1, size_bytes);
        write_uint(&mut out, 0, size_bytes);
        write_uint(&mut out, body.len(), offset_bytes);
        write_uint(&mut out, 0, size_bytes);
        out.extend_from_slice(&body);

        if with_crc {
            let crc = crc32c(&out);
            out.extend_from_slice(&crc.to_le_bytes());
        }
        out
    }

    pub fn to_boc_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.to_boc(true))
    }

    pub fn to_boc_base64_url(&self) -> String {
        general_purpose::URL_SAFE_NO_PAD.encode(self.to_boc(true))
    }

    // Parse a bag of cells with exactly one root
    pub fn from_boc(bytes: &[u8]) -> Result<Cell, CellError> {
        let mut roots = parse_boc(bytes)?;
        if roots.len() != 1 {
            return Err(CellError::InvalidBoc("expected a single root"));
        }
        let root = roots.remove(0);
        Ok(Arc::try_unwrap(root).unwrap_or_else(|shared| (*shared).clone()))
    }

    pub fn from_boc_base64(encoded: &str) -> Result<Cell, CellError> {
        let trimmed = encoded.trim();
        let bytes = general_purpose::STANDARD
            .decode(trimmed)
            .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(trimmed.trim_end_matches('=')))
            .map_err(|_| CellError::InvalidBoc("invalid base64"))?;
        Self::from_boc(&bytes)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CellError> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CellError::InvalidBoc("unexpected end of data"))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CellError> {
        Ok(self.take(1)?[0])
    }

    fn read_uint(&mut self, n: usize) -> Result<usize, CellError> {
        Ok(self
            .take(n)?
            .iter()
            .fold(0usize, |acc, byte| (acc << 8) | *byte as usize))
    }
}

struct RawCell<'a> {
    data: &'a [u8],
    bit_len: usize,
    refs: Vec<usize>,
}

fn read_raw_cell<'a>(reader: &mut Reader<'a>, size_bytes: usize) -> Result<RawCell<'a>, CellError> {
    let d1 = reader.read_u8()?;
    let d2 = reader.read_u8()?;
    if d1 & 0x08 != 0 {
        return Err(CellError::ExoticCell);
    }
    if d1 & 0x10 != 0 {
        return Err(CellError::InvalidBoc("stored hashes are not supported"));
    }
    let refs_count = (d1 & 0x07) as usize;
    if refs_count > MAX_CELL_REFS {
        return Err(CellError::InvalidBoc("too many references"));
    }

    let data_len = (d2 as usize).div_ceil(2);
    let data = reader.take(data_len)?;
    let bit_len = if d2 % 2 == 0 {
        data_len * 8
    } else {
        // Strip the completion tag
        let last = data[data_len - 1];
        if last == 0 {
            return Err(CellError::InvalidBoc("missing completion tag"));
        }
        data_len * 8 - last.trailing_zeros() as usize - 1
    };

    let mut refs = Vec::with_capacity(refs_count);
    for _ in 0..refs_count {
        refs.push(reader.read_uint(size_bytes)?);
    }

    Ok(RawCell {
        data,
        bit_len,
        refs,
    })
}

pub fn parse_boc(bytes: &[u8]) -> Result<Vec<Arc<Cell>>, CellError> {
    let mut reader = Reader { bytes, offset: 0 };
    if reader.take(4)? != BOC_MAGIC {
        return Err(CellError::InvalidBoc("unknown magic"));
    }

    let flags = reader.read_u8()?;
    let has_index = flags & FLAG_HAS_INDEX != 0;
    let has_crc = flags & FLAG_HAS_CRC32C != 0;
    let size_bytes = (flags & SIZE_BYTES_MASK) as usize;
    if size_bytes == 0 || size_bytes > 4 {
        return Err(CellError::InvalidBoc("invalid size bytes"));
    }
    let offset_bytes = reader.read_u8()? as usize;
    if offset_bytes == 0 || offset_bytes > 8 {
        return Err(CellError::InvalidBoc("invalid offset bytes"));
    }

    let cells_count = reader.read_uint(size_bytes)?;
    let roots_count = reader.read_uint(size_bytes)?;
    let _absent = reader.read_uint(size_bytes)?;
    let total_size = reader.read_uint(offset_bytes)?;
    if roots_count == 0 || roots_count > cells_count {
        return Err(CellError::InvalidBoc("invalid roots count"));
    }

    let mut root_indexes = Vec::new();
    for _ in 0..roots_count {
        root_indexes.push(reader.read_uint(size_bytes)?);
    }
    if has_index {
        let index_size = cells_count
            .checked_mul(offset_bytes)
            .ok_or(CellError::InvalidBoc("index too large"))?;
        reader.take(index_size)?;
    }

    let cells_start = reader.offset;
    // Every cell takes at least two bytes
    if cells_count > bytes.len() / 2 {
        return Err(CellError::InvalidBoc("cells count too large"));
    }
    let mut raw_cells = Vec::with_capacity(cells_count);
    for _ in 0..cells_count {
        raw_cells.push(read_raw_cell(&mut reader, size_bytes)?);
    }
    if reader.offset - cells_start != total_size {
        return Err(CellError::InvalidBoc("cells size mismatch"));
    }

    if has_crc {
        let expected = reader.offset;
        let trailer = reader.take(4)?;
        let crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        if crc != crc32c(&bytes[..expected]) {
            return Err(CellError::BocChecksumMismatch);
        }
    }

    // Children always have a greater index, build from the end
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cells_count];
    for (index, raw) in raw_cells.into_iter().enumerate().rev() {
        let mut refs = Vec::with_capacity(raw.refs.len());
        for r in raw.refs {
            if r <= index {
                return Err(CellError::InvalidBoc("reference to a previous cell"));
            }
            let child = built
                .get(r)
                .and_then(Option::clone)
                .ok_or(CellError::InvalidBoc("reference out of bounds"))?;
            refs.push(child);
        }
        let cell = Cell::from_parts(raw.data.to_vec(), raw.bit_len, refs)?;
        built[index] = Some(Arc::new(cell));
    }

    root_indexes
        .into_iter()
        .map(|index| {
            built
                .get(index)
                .and_then(Option::clone)
                .ok_or(CellError::InvalidBoc("root out of bounds"))
        })
        .collect()
}
