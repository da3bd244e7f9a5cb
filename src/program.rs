use fxhash::FxHashMap;

use crate::opcode::Instr;
use crate::symbol::{Labels, Mnemonic};

/// Every program is assembled starting here.
pub const LOAD_ADDRESS: u16 = 0x8000;

/// One assembled instruction, as shown in listings and used for fetching.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Record {
    pub address: u16,
    pub mnemonic: Mnemonic,
    /// Operand tokens as written in the source
    pub operands: Vec<String>,
    pub opcode: u8,
    /// 1-based source line
    pub line: usize,
    /// Decoded form with values resolved
    pub instr: Instr,
}

/// Machine code image plus the instruction table indexed by address.
#[derive(Clone, Debug)]
pub struct Program {
    records: Vec<Record>,
    index: FxHashMap<u16, usize>,
    labels: Labels,
    image: Vec<u8>,
}

impl Program {
    pub fn new(labels: Labels) -> Self {
        Program {
            records: Vec::new(),
            index: FxHashMap::default(),
            labels,
            image: Vec::new(),
        }
    }

    /// Append the next instruction. Records arrive in address order with no gaps.
    pub(crate) fn push(&mut self, record: Record, bytes: &[u8]) {
        debug_assert_eq!(
            record.address as usize,
            LOAD_ADDRESS as usize + self.image.len()
        );
        self.index.insert(record.address, self.records.len());
        self.records.push(record);
        self.image.extend_from_slice(bytes);
    }

    /// Instruction starting exactly at `addr`.
    pub fn get(&self, addr: u16) -> Option<&Record> {
        self.index.get(&addr).map(|&i| &self.records[i])
    }

    pub fn source_line(&self, addr: u16) -> Option<usize> {
        self.get(addr).map(|record| record.line)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Encoded bytes from [`LOAD_ADDRESS`] onwards.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for Program {
    fn default() -> Self {
        Program::new(crate::symbol::new_labels())
    }
}
