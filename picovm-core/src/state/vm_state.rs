use crate::{error::VMCoreError, program::instruction::Instruction, state::memory::Memory};
use picovm_types::{
    common::{RegValue, SignedGas},
    constants::REGISTERS_COUNT,
};

pub type RegIndex = usize;
pub type Registers = [RegValue; REGISTERS_COUNT];

/// Mutable VM state
#[derive(Clone, Debug, PartialEq)]
pub struct VMState {
    /// Registers
    pub regs: Registers,
    /// Paged RAM
    pub memory: Memory,
    /// Program counter, a byte offset into the program image
    pub pc: RegValue,
    /// Gas counter
    pub gas_counter: SignedGas,
}

impl VMState {
    /// Fresh state: zeroed registers, empty memory, pc 0 and the given
    /// gas allocation.
    pub fn new(gas_limit: SignedGas) -> Self {
        Self {
            regs: [0; REGISTERS_COUNT],
            memory: Memory::new(),
            pc: 0,
            gas_counter: gas_limit,
        }
    }

    #[inline(always)]
    pub fn pc(&self) -> RegValue {
        self.pc
    }

    #[inline(always)]
    pub fn gas(&self) -> SignedGas {
        self.gas_counter
    }

    #[inline(always)]
    pub fn read_reg(&self, index: RegIndex) -> Result<RegValue, VMCoreError> {
        self.regs
            .get(index)
            .copied()
            .ok_or(VMCoreError::InvalidRegIndex(index))
    }

    #[inline(always)]
    pub fn read_rs1(&self, ins: &Instruction) -> Result<RegValue, VMCoreError> {
        self.read_reg(ins.rs1()?)
    }

    #[inline(always)]
    pub fn read_rs2(&self, ins: &Instruction) -> Result<RegValue, VMCoreError> {
        self.read_reg(ins.rs2()?)
    }

    #[inline(always)]
    pub fn read_rd(&self, ins: &Instruction) -> Result<RegValue, VMCoreError> {
        self.read_reg(ins.rd()?)
    }
}
