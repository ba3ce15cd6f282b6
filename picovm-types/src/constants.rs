//! VM-specific constants
use crate::common::SignedGas;

/// The number of VM registers.
pub const REGISTERS_COUNT: usize = 13;

/// `Z_P`: VM memory page size in octets.
pub const PAGE_SIZE: usize = 1 << 12;

/// Size of one instruction word in octets.
pub const INSTRUCTION_SIZE: usize = 4;

/// Instruction target address alignment factor.
pub const JUMP_ALIGNMENT: usize = 4;

/// Gas allocation used when the caller does not provide a limit.
pub const DEFAULT_GAS_LIMIT: SignedGas = 1_000_000;
