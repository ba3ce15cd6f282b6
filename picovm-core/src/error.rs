use crate::{program::instruction::opcode::Opcode, state::memory::MemoryError};
use thiserror::Error;

/// VM Core Error Codes
#[derive(Debug, Error)]
pub enum VMCoreError {
    #[error("Invalid program")]
    InvalidProgram,
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(u8),
    #[error("Invalid instruction format")]
    InvalidInstructionFormat,
    #[error("Invalid register index: {0}")]
    InvalidRegIndex(usize),
    #[error("Immediate value not found in the instruction. Opcode: {0:?}")]
    ImmValNotFound(Opcode),
    #[error("Source register index not found in the instruction. Opcode: {0:?}")]
    SourceRegIdxNotFound(Opcode),
    #[error("Destination register index not found in the instruction. Opcode: {0:?}")]
    DestinationRegIdxNotFound(Opcode),
    #[error("MemoryError: {0}")]
    MemoryError(#[from] MemoryError),
}
