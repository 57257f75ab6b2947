//! `TableBlock`: the per-table columnar portion of a `MemoryBlock`.

use crate::cell::{fixed_size, is_var_length, ColumnType, ColumnTypeTag};
use crate::row::Row;
use crate::schema::ColumnConfig;

/// One column's storage inside a `TableBlock`: either a contiguous
/// fixed-width buffer or a variable-width arena with per-row length/offset
/// tracking, matching `MemoryPool::TableBlock::Column` in the original
/// implementation.
#[derive(Debug)]
pub enum ColumnStorage {
    Fixed {
        tag: ColumnTypeTag,
        element_size: usize,
        /// Raw little-endian bytes, `max_rows * element_size` long.
        data: Vec<u8>,
    },
    Variable {
        tag: ColumnTypeTag,
        max_length: usize,
        bytes: Vec<u8>,
        lengths: Vec<u32>,
        offsets: Vec<u64>,
        write_cursor: u64,
    },
}

impl ColumnStorage {
    fn new(config: &ColumnConfig, max_rows: usize) -> Self {
        if is_var_length(config.type_tag) {
            // Arena sized generously: declared length per row, doubled to
            // absorb the occasional oversized sample without reallocating.
            let capacity = (config.declared_length() * max_rows * 2).max(64);
            ColumnStorage::Variable {
                tag: config.type_tag,
                max_length: config.declared_length(),
                bytes: vec![0u8; capacity],
                lengths: vec![0u32; max_rows],
                offsets: vec![0u64; max_rows],
                write_cursor: 0,
            }
        } else {
            let element_size = fixed_size(config.type_tag).expect("fixed type has fixed_size");
            ColumnStorage::Fixed {
                tag: config.type_tag,
                element_size,
                data: vec![0u8; element_size * max_rows],
            }
        }
    }

    fn reset(&mut self) {
        if let ColumnStorage::Variable { write_cursor, .. } = self {
            *write_cursor = 0;
        }
    }

    fn write(&mut self, row_idx: usize, cell: &ColumnType) {
        match self {
            ColumnStorage::Fixed {
                element_size, data, ..
            } => {
                let dest = &mut data[row_idx * *element_size..(row_idx + 1) * *element_size];
                write_fixed(cell, dest);
            }
            ColumnStorage::Variable {
                bytes,
                lengths,
                offsets,
                write_cursor,
                max_length,
                ..
            } => {
                let encoded = encode_variable(cell);
                let needed_end = *write_cursor as usize + encoded.len();
                if needed_end > bytes.len() {
                    bytes.resize(needed_end.next_power_of_two(), 0);
                }
                let start = *write_cursor as usize;
                bytes[start..start + encoded.len()].copy_from_slice(&encoded);
                offsets[row_idx] = *write_cursor;
                lengths[row_idx] = encoded.len() as u32;
                *write_cursor += encoded.len() as u64;
                let _ = max_length; // declared length is advisory, not enforced on write
            }
        }
    }

    pub fn tag(&self) -> ColumnTypeTag {
        match self {
            ColumnStorage::Fixed { tag, .. } => *tag,
            ColumnStorage::Variable { tag, .. } => *tag,
        }
    }

    /// Read back a fixed-width cell. Used by formatters that walk the block
    /// column-major rather than carrying the original `Row`s around.
    pub fn read(&self, row_idx: usize) -> ColumnType {
        match self {
            ColumnStorage::Fixed {
                tag, element_size, data,
            } => {
                let src = &data[row_idx * *element_size..(row_idx + 1) * *element_size];
                read_fixed(*tag, src)
            }
            ColumnStorage::Variable {
                tag,
                bytes,
                lengths,
                offsets,
                ..
            } => {
                let start = offsets[row_idx] as usize;
                let len = lengths[row_idx] as usize;
                read_variable(*tag, &bytes[start..start + len])
            }
        }
    }
}

fn write_fixed(cell: &ColumnType, dest: &mut [u8]) {
    match cell {
        ColumnType::Bool(v) => dest[0] = *v as u8,
        ColumnType::TinyInt(v) => dest[0] = *v as u8,
        ColumnType::UTinyInt(v) => dest[0] = *v,
        ColumnType::SmallInt(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::USmallInt(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::Int(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::UInt(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::Float(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::BigInt(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::UBigInt(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::Double(v) => dest.copy_from_slice(&v.to_le_bytes()),
        ColumnType::Null(_) => dest.fill(0),
        other => panic!("{other:?} is not a fixed-width cell"),
    }
}

fn read_fixed(tag: ColumnTypeTag, src: &[u8]) -> ColumnType {
    match tag {
        ColumnTypeTag::Bool => ColumnType::Bool(src[0] != 0),
        ColumnTypeTag::TinyInt => ColumnType::TinyInt(src[0] as i8),
        ColumnTypeTag::UTinyInt => ColumnType::UTinyInt(src[0]),
        ColumnTypeTag::SmallInt => ColumnType::SmallInt(i16::from_le_bytes(src.try_into().unwrap())),
        ColumnTypeTag::USmallInt => ColumnType::USmallInt(u16::from_le_bytes(src.try_into().unwrap())),
        ColumnTypeTag::Int => ColumnType::Int(i32::from_le_bytes(src.try_into().unwrap())),
        ColumnTypeTag::UInt => ColumnType::UInt(u32::from_le_bytes(src.try_into().unwrap())),
        ColumnTypeTag::Float => ColumnType::Float(f32::from_le_bytes(src.try_into().unwrap())),
        ColumnTypeTag::BigInt => ColumnType::BigInt(i64::from_le_bytes(src.try_into().unwrap())),
        ColumnTypeTag::UBigInt => ColumnType::UBigInt(u64::from_le_bytes(src.try_into().unwrap())),
        ColumnTypeTag::Double => ColumnType::Double(f64::from_le_bytes(src.try_into().unwrap())),
        other => unreachable!("{other:?} is not a fixed-width tag"),
    }
}

fn encode_variable(cell: &ColumnType) -> Vec<u8> {
    match cell {
        ColumnType::Decimal(s) | ColumnType::Varchar(s) | ColumnType::Json(s) | ColumnType::Geometry(s) => {
            s.as_bytes().to_vec()
        }
        ColumnType::NChar(units) => units.iter().flat_map(|u| u.to_le_bytes()).collect(),
        ColumnType::Binary(b) | ColumnType::VarBinary(b) => b.clone(),
        ColumnType::Null(_) => Vec::new(),
        other => panic!("{other:?} is not a variable-width cell"),
    }
}

fn read_variable(tag: ColumnTypeTag, bytes: &[u8]) -> ColumnType {
    match tag {
        ColumnTypeTag::Decimal => ColumnType::Decimal(String::from_utf8_lossy(bytes).into_owned()),
        ColumnTypeTag::Varchar => ColumnType::Varchar(String::from_utf8_lossy(bytes).into_owned()),
        ColumnTypeTag::Json => ColumnType::Json(String::from_utf8_lossy(bytes).into_owned()),
        ColumnTypeTag::Geometry => ColumnType::Geometry(String::from_utf8_lossy(bytes).into_owned()),
        ColumnTypeTag::NChar => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            ColumnType::NChar(units)
        }
        ColumnTypeTag::Binary => ColumnType::Binary(bytes.to_vec()),
        ColumnTypeTag::VarBinary => ColumnType::VarBinary(bytes.to_vec()),
        other => unreachable!("{other:?} is not a variable-width tag"),
    }
}

/// Per-table columnar staging buffer. Lives inside a `MemoryBlock` for the
/// lifetime of one acquire/release cycle.
#[derive(Debug)]
pub struct TableBlock {
    pub table_name: String,
    pub timestamps: Vec<i64>,
    pub columns: Vec<ColumnStorage>,
    /// `is_null[col][row]`.
    pub is_null: Vec<Vec<u8>>,
    pub max_rows: usize,
    pub used_rows: usize,
}

impl TableBlock {
    pub fn new(max_rows: usize, columns_cfg: &[ColumnConfig]) -> Self {
        let columns = columns_cfg
            .iter()
            .map(|c| ColumnStorage::new(c, max_rows))
            .collect();
        let is_null = columns_cfg.iter().map(|_| vec![0u8; max_rows]).collect();
        Self {
            table_name: String::new(),
            timestamps: vec![0; max_rows],
            columns,
            is_null,
            max_rows,
            used_rows: 0,
        }
    }

    pub fn reset(&mut self) {
        self.used_rows = 0;
        for c in &mut self.columns {
            c.reset();
        }
        // is_null bits are intentionally left stale; every occupied row
        // below `used_rows` is always rewritten by `add_row`/`add_rows`
        // before being read, see the open question in SPEC_FULL.md.
    }

    /// Append one row. Panics if the block is full — callers (the pool and
    /// the producer loop) are expected to check capacity first, exactly as
    /// the C++ `add_row` assumes `used_rows < max_rows`.
    pub fn add_row(&mut self, row: &Row) {
        assert!(
            self.used_rows < self.max_rows,
            "TableBlock '{}' is full",
            self.table_name
        );
        let idx = self.used_rows;
        self.timestamps[idx] = row.timestamp;
        for (col_idx, cell) in row.columns.iter().enumerate() {
            if cell.is_null() {
                self.is_null[col_idx][idx] = 1;
            } else {
                self.is_null[col_idx][idx] = 0;
                self.columns[col_idx].write(idx, cell);
            }
        }
        self.used_rows += 1;
    }

    /// Batch variant: write all timestamps first, then walk column by
    /// column, matching the original's `add_rows` cache-locality trick.
    pub fn add_rows(&mut self, rows: &[Row]) {
        assert!(
            self.used_rows + rows.len() <= self.max_rows,
            "TableBlock '{}' cannot hold {} more rows (used={}, max={})",
            self.table_name,
            rows.len(),
            self.used_rows,
            self.max_rows
        );
        let start = self.used_rows;
        for (i, row) in rows.iter().enumerate() {
            self.timestamps[start + i] = row.timestamp;
        }
        for col_idx in 0..self.columns.len() {
            for (i, row) in rows.iter().enumerate() {
                let cell = &row.columns[col_idx];
                let idx = start + i;
                if cell.is_null() {
                    self.is_null[col_idx][idx] = 1;
                } else {
                    self.is_null[col_idx][idx] = 0;
                    self.columns[col_idx].write(idx, cell);
                }
            }
        }
        self.used_rows += rows.len();
    }

    pub fn is_null_at(&self, col_idx: usize, row_idx: usize) -> bool {
        self.is_null[col_idx][row_idx] != 0
    }

    pub fn cell_at(&self, col_idx: usize, row_idx: usize) -> ColumnType {
        if self.is_null_at(col_idx, row_idx) {
            ColumnType::Null(self.columns[col_idx].tag())
        } else {
            self.columns[col_idx].read(row_idx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GeneratorKind, GeneratorParams};

    fn col(name: &str, tag: ColumnTypeTag, length: Option<usize>) -> ColumnConfig {
        ColumnConfig {
            name: name.to_string(),
            type_tag: tag,
            length,
            generator: GeneratorKind::Random,
            params: GeneratorParams::default(),
            null_ratio: 0.0,
            is_primary_key: false,
        }
    }

    #[test]
    fn add_row_then_read_back_fixed_and_variable() {
        let cfgs = vec![
            col("f", ColumnTypeTag::Float, None),
            col("s", ColumnTypeTag::Varchar, Some(8)),
        ];
        let mut block = TableBlock::new(4, &cfgs);
        block.add_row(&Row::new(
            1500000000000,
            vec![ColumnType::Float(3.14), ColumnType::Varchar("hi".to_string())],
        ));
        assert_eq!(block.used_rows, 1);
        assert_eq!(block.timestamps[0], 1500000000000);
        assert_eq!(block.cell_at(0, 0), ColumnType::Float(3.14));
        assert_eq!(block.cell_at(1, 0), ColumnType::Varchar("hi".to_string()));
    }

    #[test]
    fn null_bit_set_and_no_value_written() {
        let cfgs = vec![col("i", ColumnTypeTag::Int, None)];
        let mut block = TableBlock::new(2, &cfgs);
        block.add_row(&Row::new(1, vec![ColumnType::Null(ColumnTypeTag::Int)]));
        assert!(block.is_null_at(0, 0));
    }

    #[test]
    fn reset_clears_used_rows_and_cursor() {
        let cfgs = vec![col("s", ColumnTypeTag::Varchar, Some(8))];
        let mut block = TableBlock::new(2, &cfgs);
        block.add_row(&Row::new(1, vec![ColumnType::Varchar("abc".into())]));
        block.reset();
        assert_eq!(block.used_rows, 0);
        if let ColumnStorage::Variable { write_cursor, .. } = &block.columns[0] {
            assert_eq!(*write_cursor, 0);
        } else {
            panic!("expected variable storage");
        }
    }
}
