use crate::{
    continue_with_mem_write, continue_with_reg_write,
    error::VMCoreError,
    interpreter::{Interpreter, SingleStepResult},
    jump_result, mem_read,
    program::instruction::Instruction,
    state::{
        memory::AccessType,
        state_change::{MemWrite, VMStateChange},
        vm_state::VMState,
    },
    utils::{SextInputSize, VMUtils},
};
use picovm_types::{
    common::{MemAddress, PageIndex, RegValue},
    constants::{JUMP_ALIGNMENT, PAGE_SIZE},
    exit_reason::{ExitReason, PanicReason},
};

/// A collection of single-step instruction execution functions.
///
/// Each function consumes a decoded instruction and the current VM state
/// and produces an exit reason plus a state change set; `sbrk` is the only
/// instruction that mutates the state directly, for page allocation.
pub struct InstructionSet;
impl InstructionSet {
    //
    // Group 1: Instructions without arguments
    //

    /// `panic` with no mutation to the VM state
    ///
    /// Opcode: 0
    pub fn trap(
        vm_state: &VMState,
        _ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        Ok(SingleStepResult {
            exit_reason: ExitReason::Panic(PanicReason::Trap),
            state_change: VMStateChange {
                new_pc: vm_state.pc,
                ..Default::default()
            },
        })
    }

    /// Continue program with no mutation to the VM state
    ///
    /// Opcode: 1
    pub fn fallthrough(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        Ok(SingleStepResult {
            exit_reason: ExitReason::Continue,
            state_change: VMStateChange {
                new_pc: Interpreter::next_pc(vm_state),
                gas_charge: ins.op.gas_cost(),
                ..Default::default()
            },
        })
    }

    //
    // Group 2: Instructions with arguments of one immediate
    //

    /// Surrender control to the host with the immediate-encoded call id.
    /// The pc stays at the `ecalli` word so the host can inspect it and
    /// resume past it.
    ///
    /// Opcode: 10
    pub fn ecalli(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let host_call_id = ins.imm1()?;
        Ok(SingleStepResult {
            exit_reason: ExitReason::HostCall(host_call_id),
            state_change: VMStateChange {
                new_pc: vm_state.pc,
                ..Default::default()
            },
        })
    }

    //
    // Group 3: Instructions with arguments of one register and one extended width immediate
    //

    /// Load an extended width immediate value into a register
    ///
    /// Opcode: 20
    pub fn load_imm_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, ins.imm1()?)
    }

    //
    // Group 4: Instructions with arguments of two immediates
    //

    /// Store immediate argument value to the memory as `u8` integer type
    ///
    /// Opcode: 30
    pub fn store_imm_u8(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let imm_address = ins.imm1()? as MemAddress;
        let value = VMUtils::u64_to_le(ins.imm2()?, 1); // mod 2^8
        continue_with_mem_write!(vm_state, ins, imm_address, value)
    }

    /// Store immediate argument value to the memory as `u16` integer type
    ///
    /// Opcode: 31
    pub fn store_imm_u16(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let imm_address = ins.imm1()? as MemAddress;
        let value = VMUtils::u64_to_le(ins.imm2()?, 2); // mod 2^16
        continue_with_mem_write!(vm_state, ins, imm_address, value)
    }

    /// Store immediate argument value to the memory as `u32` integer type
    ///
    /// Opcode: 32
    pub fn store_imm_u32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let imm_address = ins.imm1()? as MemAddress;
        let value = VMUtils::u64_to_le(ins.imm2()?, 4); // mod 2^32
        continue_with_mem_write!(vm_state, ins, imm_address, value)
    }

    /// Store immediate argument value to the memory as `u64` integer type
    ///
    /// Opcode: 33
    pub fn store_imm_u64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let imm_address = ins.imm1()? as MemAddress;
        let value = VMUtils::u64_to_le(ins.imm2()?, 8);
        continue_with_mem_write!(vm_state, ins, imm_address, value)
    }

    //
    // Group 5: Instructions with arguments of one offset
    //

    /// Jump to the target address with no condition checks. The decoder
    /// already resolved the signed offset against the pc.
    ///
    /// Opcode: 40
    pub fn jump(
        _vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let target = ins.imm1()?;
        tracing::trace!("{:?} target: {target}", ins.op);
        jump_result!(ins, target)
    }

    //
    // Group 6: Instructions with arguments of one register & one immediate
    //

    /// Jump to an address stored in a register plus an immediate offset,
    /// rounded down to the instruction alignment.
    ///
    /// Opcode: 50
    pub fn jump_ind(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)?;
        let target = rs1_val.wrapping_add(ins.imm1()?) & !(JUMP_ALIGNMENT as RegValue - 1);
        tracing::trace!("{:?} target: {target}", ins.op);
        jump_result!(ins, target)
    }

    /// Load an immediate value into a register
    ///
    /// Opcode: 51
    pub fn load_imm(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, ins.imm1()?)
    }

    /// Load an unsigned 8-bit value from memory into a register
    ///
    /// Opcode: 52
    pub fn load_u8(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let val = mem_read!(vm_state, address, 1);
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, val[0] as RegValue)
    }

    /// Load a signed 8-bit value from memory into a register
    ///
    /// Opcode: 53
    pub fn load_i8(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let val = mem_read!(vm_state, address, 1);
        let val_extended = VMUtils::sext(val[0], SextInputSize::Octets1);
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, val_extended)
    }

    /// Load an unsigned 16-bit value from memory into a register
    ///
    /// Opcode: 54
    pub fn load_u16(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let val = mem_read!(vm_state, address, 2);
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, VMUtils::u64_from_le(&val))
    }

    /// Load a signed 16-bit value from memory into a register
    ///
    /// Opcode: 55
    pub fn load_i16(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let val = mem_read!(vm_state, address, 2);
        let val_extended = VMUtils::sext(VMUtils::u64_from_le(&val), SextInputSize::Octets2);
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, val_extended)
    }

    /// Load an unsigned 32-bit value from memory into a register
    ///
    /// Opcode: 56
    pub fn load_u32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let val = mem_read!(vm_state, address, 4);
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, VMUtils::u64_from_le(&val))
    }

    /// Load a signed 32-bit value from memory into a register
    ///
    /// Opcode: 57
    pub fn load_i32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let val = mem_read!(vm_state, address, 4);
        let val_extended = VMUtils::sext(VMUtils::u64_from_le(&val), SextInputSize::Octets4);
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, val_extended)
    }

    /// Load an unsigned 64-bit value from memory into a register
    ///
    /// Opcode: 58
    pub fn load_u64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let val = mem_read!(vm_state, address, 8);
        continue_with_reg_write!(vm_state, ins, ins.rs1()?, VMUtils::u64_from_le(&val))
    }

    /// Store the low 8 bits of a register to memory
    ///
    /// Opcode: 59
    pub fn store_u8(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let value = VMUtils::u64_to_le(vm_state.read_rs1(ins)?, 1);
        continue_with_mem_write!(vm_state, ins, address, value)
    }

    /// Store the low 16 bits of a register to memory
    ///
    /// Opcode: 60
    pub fn store_u16(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let value = VMUtils::u64_to_le(vm_state.read_rs1(ins)?, 2);
        continue_with_mem_write!(vm_state, ins, address, value)
    }

    /// Store the low 32 bits of a register to memory
    ///
    /// Opcode: 61
    pub fn store_u32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let value = VMUtils::u64_to_le(vm_state.read_rs1(ins)?, 4);
        continue_with_mem_write!(vm_state, ins, address, value)
    }

    /// Store a full register to memory
    ///
    /// Opcode: 62
    pub fn store_u64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let address = Self::effective_address(vm_state, ins)?;
        let value = VMUtils::u64_to_le(vm_state.read_rs1(ins)?, 8);
        continue_with_mem_write!(vm_state, ins, address, value)
    }

    //
    // Group 9: Instructions with arguments of two registers
    //

    /// Copy one register into another
    ///
    /// Opcode: 100
    pub fn move_reg(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val)
    }

    /// System break (allocate heap memory)
    ///
    /// Appends enough fresh read-write pages to the end of the page map to
    /// cover the requested size and returns the base address of the new
    /// area. A simple bump allocator: nothing is reclaimed or deduplicated
    /// and holes in the page map are not considered.
    ///
    /// Opcode: 101
    pub fn sbrk(
        vm_state: &mut VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let expand_size = vm_state.read_rs1(ins)? as usize;
        let pages_needed = expand_size.div_ceil(PAGE_SIZE);

        let base_page = vm_state.memory.page_count() as PageIndex;
        for offset in 0..pages_needed as PageIndex {
            vm_state
                .memory
                .allocate(base_page + offset, AccessType::ReadWrite);
        }

        let alloc_start = base_page * PAGE_SIZE as MemAddress;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, alloc_start)
    }

    /// Count the number of set bits of a 64-bit value
    ///
    /// Opcode: 102
    pub fn count_set_bits_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val.count_ones() as RegValue)
    }

    /// Count the number of set bits of a 32-bit value
    ///
    /// Opcode: 103
    pub fn count_set_bits_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)? as u32;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val.count_ones() as RegValue)
    }

    /// Count the number of leading zeroes of a 64-bit value
    ///
    /// Opcode: 104
    pub fn leading_zero_bits_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val.leading_zeros() as RegValue)
    }

    /// Count the number of leading zeroes of a 32-bit value
    ///
    /// Opcode: 105
    pub fn leading_zero_bits_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)? as u32;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val.leading_zeros() as RegValue)
    }

    /// Count the number of trailing zeroes of a 64-bit value
    ///
    /// Opcode: 106
    pub fn trailing_zero_bits_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val.trailing_zeros() as RegValue)
    }

    /// Count the number of trailing zeroes of a 32-bit value
    ///
    /// Opcode: 107
    pub fn trailing_zero_bits_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)? as u32;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val.trailing_zeros() as RegValue)
    }

    /// Sign extend an 8-bit value
    ///
    /// Opcode: 108
    pub fn sign_extend_8(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = (vm_state.read_rs1(ins)? & 0xFF) as u8;
        let val = VMUtils::sext(rs1_val, SextInputSize::Octets1);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, val)
    }

    /// Sign extend a 16-bit value
    ///
    /// Opcode: 109
    pub fn sign_extend_16(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = (vm_state.read_rs1(ins)? & 0xFFFF) as u16;
        let val = VMUtils::sext(rs1_val, SextInputSize::Octets2);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, val)
    }

    /// Zero extend a 16-bit value
    ///
    /// Opcode: 110
    pub fn zero_extend_16(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)? & 0xFFFF;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val)
    }

    /// Reverse bytes of a 64-bit value
    ///
    /// Opcode: 111
    pub fn reverse_bytes(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, rs1_val.swap_bytes())
    }

    //
    // Group 13: Instructions with arguments of three registers
    //

    /// Add two registers and get a 32-bit value
    ///
    /// Opcode: 190
    pub fn add_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state
            .read_rs1(ins)?
            .wrapping_add(vm_state.read_rs2(ins)?);
        let result_extended = VMUtils::sext(result & 0xFFFF_FFFF, SextInputSize::Octets4);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result_extended)
    }

    /// Subtract two registers and get a 32-bit value
    ///
    /// Opcode: 191
    pub fn sub_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state
            .read_rs1(ins)?
            .wrapping_sub(vm_state.read_rs2(ins)?);
        let result_extended = VMUtils::sext(result & 0xFFFF_FFFF, SextInputSize::Octets4);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result_extended)
    }

    /// Multiply two registers and get a 32-bit value
    ///
    /// Opcode: 192
    pub fn mul_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state
            .read_rs1(ins)?
            .wrapping_mul(vm_state.read_rs2(ins)?);
        let result_extended = VMUtils::sext(result & 0xFFFF_FFFF, SextInputSize::Octets4);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result_extended)
    }

    /// Divide unsigned and get a 32-bit value
    ///
    /// Opcode: 193
    pub fn div_u_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = vm_state.read_rs1(ins)? & 0xFFFF_FFFF;
        let divisor = vm_state.read_rs2(ins)? & 0xFFFF_FFFF;
        let result = if divisor == 0 {
            u64::MAX
        } else {
            VMUtils::sext(dividend / divisor, SextInputSize::Octets4)
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Divide signed and get a 32-bit value
    ///
    /// Opcode: 194
    pub fn div_s_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = VMUtils::u32_to_i32((vm_state.read_rs1(ins)? & 0xFFFF_FFFF) as u32);
        let divisor = VMUtils::u32_to_i32((vm_state.read_rs2(ins)? & 0xFFFF_FFFF) as u32);
        let result = if divisor == 0 {
            u64::MAX
        } else if dividend == i32::MIN && divisor == -1 {
            VMUtils::i64_to_u64(dividend as i64)
        } else {
            VMUtils::i64_to_u64((dividend / divisor) as i64)
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Remainder unsigned and get a 32-bit value
    ///
    /// Opcode: 195
    pub fn rem_u_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = vm_state.read_rs1(ins)? & 0xFFFF_FFFF;
        let divisor = vm_state.read_rs2(ins)? & 0xFFFF_FFFF;
        let result = if divisor == 0 {
            VMUtils::sext(dividend, SextInputSize::Octets4)
        } else {
            VMUtils::sext(dividend % divisor, SextInputSize::Octets4)
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Remainder signed and get a 32-bit value
    ///
    /// Opcode: 196
    pub fn rem_s_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = VMUtils::u32_to_i32((vm_state.read_rs1(ins)? & 0xFFFF_FFFF) as u32);
        let divisor = VMUtils::u32_to_i32((vm_state.read_rs2(ins)? & 0xFFFF_FFFF) as u32);
        let result = if dividend == i32::MIN && divisor == -1 {
            0
        } else {
            VMUtils::i64_to_u64(VMUtils::smod_32(dividend, divisor) as i64)
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Shift left logical and get a 32-bit value
    ///
    /// Opcode: 197
    pub fn shlo_l_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let shift = vm_state.read_rs2(ins)? & 0x1F; // mod 32
        let result = (vm_state.read_rs1(ins)? as u32) << shift;
        let result_extended = VMUtils::sext(result, SextInputSize::Octets4);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result_extended)
    }

    /// Shift right logical and get a 32-bit value
    ///
    /// Opcode: 198
    pub fn shlo_r_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let shift = vm_state.read_rs2(ins)? & 0x1F; // mod 32
        let result = (vm_state.read_rs1(ins)? as u32) >> shift;
        let result_extended = VMUtils::sext(result, SextInputSize::Octets4);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result_extended)
    }

    /// Shift right arithmetic and get a 32-bit value
    ///
    /// Opcode: 199
    pub fn shar_r_32(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let shift = vm_state.read_rs2(ins)? & 0x1F; // mod 32
        let value = VMUtils::u32_to_i32(vm_state.read_rs1(ins)? as u32);
        let result = VMUtils::i64_to_u64((value >> shift) as i64);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Add two registers and get a 64-bit value
    ///
    /// Opcode: 200
    pub fn add_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state
            .read_rs1(ins)?
            .wrapping_add(vm_state.read_rs2(ins)?);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Subtract two registers and get a 64-bit value
    ///
    /// Opcode: 201
    pub fn sub_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state
            .read_rs1(ins)?
            .wrapping_sub(vm_state.read_rs2(ins)?);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Multiply two registers and get a 64-bit value
    ///
    /// Opcode: 202
    pub fn mul_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state
            .read_rs1(ins)?
            .wrapping_mul(vm_state.read_rs2(ins)?);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Divide unsigned and get a 64-bit value
    ///
    /// Opcode: 203
    pub fn div_u_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = vm_state.read_rs1(ins)?;
        let divisor = vm_state.read_rs2(ins)?;
        let result = if divisor == 0 {
            u64::MAX
        } else {
            dividend / divisor
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Divide signed and get a 64-bit value
    ///
    /// Opcode: 204
    pub fn div_s_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = VMUtils::u64_to_i64(vm_state.read_rs1(ins)?);
        let divisor = VMUtils::u64_to_i64(vm_state.read_rs2(ins)?);
        let result = if divisor == 0 {
            u64::MAX
        } else if dividend == i64::MIN && divisor == -1 {
            vm_state.read_rs1(ins)?
        } else {
            VMUtils::i64_to_u64(dividend / divisor)
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Remainder unsigned and get a 64-bit value
    ///
    /// Opcode: 205
    pub fn rem_u_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = vm_state.read_rs1(ins)?;
        let divisor = vm_state.read_rs2(ins)?;
        let result = if divisor == 0 {
            dividend
        } else {
            dividend % divisor
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Remainder signed and get a 64-bit value
    ///
    /// Opcode: 206
    pub fn rem_s_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let dividend = VMUtils::u64_to_i64(vm_state.read_rs1(ins)?);
        let divisor = VMUtils::u64_to_i64(vm_state.read_rs2(ins)?);
        let result = if dividend == i64::MIN && divisor == -1 {
            0
        } else {
            VMUtils::i64_to_u64(VMUtils::smod_64(dividend, divisor))
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Shift left logical and get a 64-bit value
    ///
    /// Opcode: 207
    pub fn shlo_l_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let shift = vm_state.read_rs2(ins)? & 0x3F; // mod 64
        let result = vm_state.read_rs1(ins)? << shift;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Shift right logical and get a 64-bit value
    ///
    /// Opcode: 208
    pub fn shlo_r_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let shift = vm_state.read_rs2(ins)? & 0x3F; // mod 64
        let result = vm_state.read_rs1(ins)? >> shift;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Shift right arithmetic and get a 64-bit value
    ///
    /// Opcode: 209
    pub fn shar_r_64(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let shift = vm_state.read_rs2(ins)? & 0x3F; // mod 64
        let value = VMUtils::u64_to_i64(vm_state.read_rs1(ins)?);
        let result = VMUtils::i64_to_u64(value >> shift);
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Bitwise AND of two registers
    ///
    /// Opcode: 210
    pub fn and(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state.read_rs1(ins)? & vm_state.read_rs2(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Bitwise XOR of two registers
    ///
    /// Opcode: 211
    pub fn xor(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state.read_rs1(ins)? ^ vm_state.read_rs2(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Bitwise OR of two registers
    ///
    /// Opcode: 212
    pub fn or(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = vm_state.read_rs1(ins)? | vm_state.read_rs2(ins)?;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Multiply upper (signed * signed)
    ///
    /// Opcode: 213
    pub fn mul_upper_s_s(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val_s = VMUtils::u64_to_i64(vm_state.read_rs1(ins)?);
        let rs2_val_s = VMUtils::u64_to_i64(vm_state.read_rs2(ins)?);
        let result = ((rs1_val_s as i128 * rs2_val_s as i128) >> 64) as i64;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, VMUtils::i64_to_u64(result))
    }

    /// Multiply upper (unsigned * unsigned)
    ///
    /// Opcode: 214
    pub fn mul_upper_u_u(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val = vm_state.read_rs1(ins)?;
        let rs2_val = vm_state.read_rs2(ins)?;
        let result = ((rs1_val as u128 * rs2_val as u128) >> 64) as u64;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Multiply upper (signed * unsigned)
    ///
    /// Opcode: 215
    pub fn mul_upper_s_u(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val_s = VMUtils::u64_to_i64(vm_state.read_rs1(ins)?);
        let rs2_val = vm_state.read_rs2(ins)?;
        let result = ((rs1_val_s as i128 * rs2_val as i128) >> 64) as i64;
        continue_with_reg_write!(vm_state, ins, ins.rd()?, VMUtils::i64_to_u64(result))
    }

    /// Set if less than (unsigned)
    ///
    /// Opcode: 216
    pub fn set_lt_u(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = if vm_state.read_rs1(ins)? < vm_state.read_rs2(ins)? {
            1
        } else {
            0
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Set if less than (signed)
    ///
    /// Opcode: 217
    pub fn set_lt_s(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let rs1_val_s = VMUtils::u64_to_i64(vm_state.read_rs1(ins)?);
        let rs2_val_s = VMUtils::u64_to_i64(vm_state.read_rs2(ins)?);
        let result = if rs1_val_s < rs2_val_s { 1 } else { 0 };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Conditional move if zero
    ///
    /// Opcode: 218
    pub fn cmov_iz(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = if vm_state.read_rs2(ins)? == 0 {
            vm_state.read_rs1(ins)?
        } else {
            vm_state.read_rd(ins)?
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Conditional move if not zero
    ///
    /// Opcode: 219
    pub fn cmov_nz(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        let result = if vm_state.read_rs2(ins)? != 0 {
            vm_state.read_rs1(ins)?
        } else {
            vm_state.read_rd(ins)?
        };
        continue_with_reg_write!(vm_state, ins, ins.rd()?, result)
    }

    /// Effective address of a one-reg-one-imm memory access:
    /// `registers[reg] + immediate`, wrapping.
    fn effective_address(
        vm_state: &VMState,
        ins: &Instruction,
    ) -> Result<MemAddress, VMCoreError> {
        Ok(vm_state.read_rs1(ins)?.wrapping_add(ins.imm1()?))
    }
}
