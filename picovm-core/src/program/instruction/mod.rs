pub mod opcode;
pub mod set;
pub mod utils;

use crate::{
    error::VMCoreError,
    program::instruction::opcode::{Opcode, Shape},
    utils::{SextInputSize, VMUtils},
};
use picovm_types::{common::RegValue, constants::REGISTERS_COUNT};

/// A decoded instruction: opcode plus typed operand fields.
///
/// Operand fields not used by the opcode's shape stay `None`; the
/// accessors return an error when an execution function asks for a field
/// its shape never carried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Opcode
    pub op: Opcode,
    /// First source register index
    pub rs1: Option<usize>,
    /// Second source register index
    pub rs2: Option<usize>,
    /// Destination register index
    pub rd: Option<usize>,
    /// First immediate value argument (value or branch target)
    pub imm1: Option<RegValue>,
    /// Second immediate value argument
    pub imm2: Option<RegValue>,
}

impl Instruction {
    fn new(
        op: Opcode,
        rs1: Option<usize>,
        rs2: Option<usize>,
        rd: Option<usize>,
        imm1: Option<RegValue>,
        imm2: Option<RegValue>,
    ) -> Result<Self, VMCoreError> {
        // Validate register indices; 4-bit fields can encode 13..15.
        for &reg in [rd, rs1, rs2].iter().flatten() {
            if reg > (REGISTERS_COUNT - 1) {
                return Err(VMCoreError::InvalidRegIndex(reg));
            }
        }
        Ok(Self {
            op,
            rs1,
            rs2,
            rd,
            imm1,
            imm2,
        })
    }

    /// Decodes a single 32-bit little-endian instruction word into an
    /// `Instruction`.
    ///
    /// The low 8 bits carry the opcode; the remaining 24 bits decode per
    /// the opcode's shape. Branch offsets are resolved against
    /// `current_pc` here, so the executor receives an absolute target.
    pub fn from_word(word: u32, current_pc: RegValue) -> Result<Self, VMCoreError> {
        let op = Opcode::from_u8((word & 0xFF) as u8)?;

        match op.shape() {
            Shape::NoArgs => Self::new(op, None, None, None, None, None),

            Shape::OneImm => {
                let imm_x = (word >> 8) as RegValue;
                Self::new(op, None, None, None, Some(imm_x), None)
            }

            Shape::OneRegOneExtImm => {
                let r_a = ((word >> 8) & 0xF) as usize;
                let imm_x = (word >> 16) as RegValue;
                Self::new(op, Some(r_a), None, None, Some(imm_x), None)
            }

            Shape::TwoImm => {
                let imm_x = ((word >> 8) & 0xFF) as RegValue;
                let imm_y = (word >> 16) as RegValue;
                Self::new(op, None, None, None, Some(imm_x), Some(imm_y))
            }

            Shape::OneOffset => {
                let offset = VMUtils::sext(word >> 8, SextInputSize::Octets3);
                let target = current_pc.wrapping_add(offset);
                Self::new(op, None, None, None, Some(target), None)
            }

            Shape::OneRegOneImm => {
                let r_a = ((word >> 8) & 0xF) as usize;
                let imm_x = (word >> 12) as RegValue;
                Self::new(op, Some(r_a), None, None, Some(imm_x), None)
            }

            Shape::TwoReg => {
                let r_d = ((word >> 8) & 0xF) as usize;
                let r_a = ((word >> 12) & 0xF) as usize;
                Self::new(op, Some(r_a), None, Some(r_d), None, None)
            }

            Shape::ThreeReg => {
                let r_a = ((word >> 8) & 0xF) as usize;
                let r_b = ((word >> 12) & 0xF) as usize;
                let r_d = ((word >> 16) & 0xF) as usize;
                Self::new(op, Some(r_a), Some(r_b), Some(r_d), None, None)
            }
        }
    }

    pub fn imm1(&self) -> Result<RegValue, VMCoreError> {
        self.imm1.ok_or(VMCoreError::ImmValNotFound(self.op))
    }

    pub fn imm2(&self) -> Result<RegValue, VMCoreError> {
        self.imm2.ok_or(VMCoreError::ImmValNotFound(self.op))
    }

    pub fn rs1(&self) -> Result<usize, VMCoreError> {
        self.rs1.ok_or(VMCoreError::SourceRegIdxNotFound(self.op))
    }

    pub fn rs2(&self) -> Result<usize, VMCoreError> {
        self.rs2.ok_or(VMCoreError::SourceRegIdxNotFound(self.op))
    }

    pub fn rd(&self) -> Result<usize, VMCoreError> {
        self.rd
            .ok_or(VMCoreError::DestinationRegIdxNotFound(self.op))
    }
}
