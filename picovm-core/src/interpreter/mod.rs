use crate::{
    error::VMCoreError,
    program::{
        instruction::{opcode::Opcode as OP, set::InstructionSet as IS, Instruction},
        loader::ProgramLoader,
    },
    state::{
        memory::{Memory, MemoryError},
        state_change::{VMStateChange, VMStateMutator},
        vm_state::{Registers, VMState},
    },
    utils::VMUtils,
};
use picovm_types::{
    common::{RegValue, SignedGas},
    constants::INSTRUCTION_SIZE,
    exit_reason::{ExitReason, PanicReason},
};

/// Exit reason and state change produced by one instruction.
#[derive(Debug)]
pub struct SingleStepResult {
    pub exit_reason: ExitReason,
    pub state_change: VMStateChange,
}

/// A finished (or host-call-suspended) invocation: the terminal exit
/// reason plus the final machine state, which stays fully observable.
#[derive(Debug)]
pub struct Execution {
    pub exit_reason: ExitReason,
    pub state: VMState,
}

impl Execution {
    pub fn registers(&self) -> &Registers {
        &self.state.regs
    }

    pub fn pc(&self) -> RegValue {
        self.state.pc
    }

    pub fn gas(&self) -> SignedGas {
        self.state.gas_counter
    }

    pub fn memory(&self) -> &Memory {
        &self.state.memory
    }

    /// Descriptive payload of the terminal exit, if it carries one.
    pub fn exit_data(&self) -> Option<String> {
        self.exit_reason.data()
    }
}

pub struct Interpreter;
impl Interpreter {
    /// The pc following the current instruction for straight-line
    /// execution; branch instructions override.
    #[inline(always)]
    pub fn next_pc(vm_state: &VMState) -> RegValue {
        vm_state.pc.wrapping_add(INSTRUCTION_SIZE as RegValue)
    }

    /// Runs a program image to termination.
    ///
    /// Fresh state is created with the given gas allocation and the
    /// prefix of `initial_regs`; the image is mapped read-only from
    /// address 0 and execution starts at pc 0. The returned `Execution`
    /// carries exactly one terminal exit reason together with the final
    /// machine state.
    ///
    /// An empty program is an argument error, reported before any state
    /// is created.
    pub fn execute(
        program: &[u8],
        initial_regs: &[RegValue],
        gas_limit: SignedGas,
    ) -> Result<Execution, VMCoreError> {
        if program.is_empty() {
            return Err(VMCoreError::InvalidProgram);
        }

        let mut vm_state = VMState::new(gas_limit);
        for (reg, value) in vm_state.regs.iter_mut().zip(initial_regs) {
            *reg = *value;
        }
        ProgramLoader::load_program(program, &mut vm_state.memory);

        let exit_reason = Self::invoke(&mut vm_state)?;
        Ok(Execution {
            exit_reason,
            state: vm_state,
        })
    }

    /// Re-enters the loop after a host-call exit.
    ///
    /// On a host-call exit the pc still addresses the `ecalli` word; the
    /// host may place results in registers or memory, then call this to
    /// advance past the `ecalli` and continue until the next terminal
    /// exit.
    pub fn resume(vm_state: &mut VMState) -> Result<ExitReason, VMCoreError> {
        vm_state.pc = Self::next_pc(vm_state);
        Self::invoke(vm_state)
    }

    /// Fetches the 32-bit little-endian instruction word at the pc.
    fn fetch(vm_state: &VMState) -> Result<u32, MemoryError> {
        let bytes = vm_state.memory.read_bytes(vm_state.pc, INSTRUCTION_SIZE)?;
        Ok(VMUtils::u64_from_le(&bytes) as u32)
    }

    /// The fetch→decode→execute loop. The sole owner of loop termination:
    /// decoder and executor end it only by producing a terminal exit
    /// reason.
    fn invoke(vm_state: &mut VMState) -> Result<ExitReason, VMCoreError> {
        loop {
            // Exhaustion is only checked at the top of a cycle; an
            // instruction begun with positive gas runs to completion.
            if vm_state.gas_counter <= 0 {
                return Ok(ExitReason::OutOfGas);
            }

            let curr_pc = vm_state.pc;

            // A failed instruction fetch is a panic, unlike a failed data
            // access, which page-faults.
            let Ok(word) = Self::fetch(vm_state) else {
                return Ok(ExitReason::Panic(PanicReason::InstructionFetch(curr_pc)));
            };

            let ins = match Instruction::from_word(word, curr_pc) {
                Ok(ins) => ins,
                Err(VMCoreError::InvalidOpcode(byte)) => {
                    return Ok(ExitReason::Panic(PanicReason::InvalidOpcode(byte)))
                }
                Err(_) => {
                    return Ok(ExitReason::Panic(PanicReason::MalformedInstruction(
                        (word & 0xFF) as u8,
                    )))
                }
            };

            let step = Self::invoke_single_step(vm_state, &ins)?;
            match VMStateMutator::apply_state_change(vm_state, &step.state_change) {
                Ok(_post_gas) => {}
                Err(VMCoreError::MemoryError(e)) => {
                    // Deferred store hit a non-writable page; nothing of
                    // the instruction's effects became visible.
                    return Ok(ExitReason::PageFault(e.page_index()));
                }
                Err(e) => return Err(e),
            }

            tracing::trace!(
                "{:?}({}) pc={} gas={} regs={:?}",
                ins.op,
                ins.op as u8,
                vm_state.pc,
                vm_state.gas_counter,
                vm_state.regs
            );

            match step.exit_reason {
                ExitReason::Continue => continue,
                terminal => return Ok(terminal),
            }
        }
    }

    /// Single-step state transition: dispatches a decoded instruction to
    /// its execution function.
    fn invoke_single_step(
        vm_state: &mut VMState,
        ins: &Instruction,
    ) -> Result<SingleStepResult, VMCoreError> {
        match ins.op {
            OP::TRAP => IS::trap(vm_state, ins),
            OP::FALLTHROUGH => IS::fallthrough(vm_state, ins),
            OP::ECALLI => IS::ecalli(vm_state, ins),
            OP::LOAD_IMM_64 => IS::load_imm_64(vm_state, ins),
            OP::STORE_IMM_U8 => IS::store_imm_u8(vm_state, ins),
            OP::STORE_IMM_U16 => IS::store_imm_u16(vm_state, ins),
            OP::STORE_IMM_U32 => IS::store_imm_u32(vm_state, ins),
            OP::STORE_IMM_U64 => IS::store_imm_u64(vm_state, ins),
            OP::JUMP => IS::jump(vm_state, ins),
            OP::JUMP_IND => IS::jump_ind(vm_state, ins),
            OP::LOAD_IMM => IS::load_imm(vm_state, ins),
            OP::LOAD_U8 => IS::load_u8(vm_state, ins),
            OP::LOAD_I8 => IS::load_i8(vm_state, ins),
            OP::LOAD_U16 => IS::load_u16(vm_state, ins),
            OP::LOAD_I16 => IS::load_i16(vm_state, ins),
            OP::LOAD_U32 => IS::load_u32(vm_state, ins),
            OP::LOAD_I32 => IS::load_i32(vm_state, ins),
            OP::LOAD_U64 => IS::load_u64(vm_state, ins),
            OP::STORE_U8 => IS::store_u8(vm_state, ins),
            OP::STORE_U16 => IS::store_u16(vm_state, ins),
            OP::STORE_U32 => IS::store_u32(vm_state, ins),
            OP::STORE_U64 => IS::store_u64(vm_state, ins),
            OP::MOVE_REG => IS::move_reg(vm_state, ins),
            OP::SBRK => IS::sbrk(vm_state, ins),
            OP::COUNT_SET_BITS_64 => IS::count_set_bits_64(vm_state, ins),
            OP::COUNT_SET_BITS_32 => IS::count_set_bits_32(vm_state, ins),
            OP::LEADING_ZERO_BITS_64 => IS::leading_zero_bits_64(vm_state, ins),
            OP::LEADING_ZERO_BITS_32 => IS::leading_zero_bits_32(vm_state, ins),
            OP::TRAILING_ZERO_BITS_64 => IS::trailing_zero_bits_64(vm_state, ins),
            OP::TRAILING_ZERO_BITS_32 => IS::trailing_zero_bits_32(vm_state, ins),
            OP::SIGN_EXTEND_8 => IS::sign_extend_8(vm_state, ins),
            OP::SIGN_EXTEND_16 => IS::sign_extend_16(vm_state, ins),
            OP::ZERO_EXTEND_16 => IS::zero_extend_16(vm_state, ins),
            OP::REVERSE_BYTES => IS::reverse_bytes(vm_state, ins),
            OP::ADD_32 => IS::add_32(vm_state, ins),
            OP::SUB_32 => IS::sub_32(vm_state, ins),
            OP::MUL_32 => IS::mul_32(vm_state, ins),
            OP::DIV_U_32 => IS::div_u_32(vm_state, ins),
            OP::DIV_S_32 => IS::div_s_32(vm_state, ins),
            OP::REM_U_32 => IS::rem_u_32(vm_state, ins),
            OP::REM_S_32 => IS::rem_s_32(vm_state, ins),
            OP::SHLO_L_32 => IS::shlo_l_32(vm_state, ins),
            OP::SHLO_R_32 => IS::shlo_r_32(vm_state, ins),
            OP::SHAR_R_32 => IS::shar_r_32(vm_state, ins),
            OP::ADD_64 => IS::add_64(vm_state, ins),
            OP::SUB_64 => IS::sub_64(vm_state, ins),
            OP::MUL_64 => IS::mul_64(vm_state, ins),
            OP::DIV_U_64 => IS::div_u_64(vm_state, ins),
            OP::DIV_S_64 => IS::div_s_64(vm_state, ins),
            OP::REM_U_64 => IS::rem_u_64(vm_state, ins),
            OP::REM_S_64 => IS::rem_s_64(vm_state, ins),
            OP::SHLO_L_64 => IS::shlo_l_64(vm_state, ins),
            OP::SHLO_R_64 => IS::shlo_r_64(vm_state, ins),
            OP::SHAR_R_64 => IS::shar_r_64(vm_state, ins),
            OP::AND => IS::and(vm_state, ins),
            OP::XOR => IS::xor(vm_state, ins),
            OP::OR => IS::or(vm_state, ins),
            OP::MUL_UPPER_S_S => IS::mul_upper_s_s(vm_state, ins),
            OP::MUL_UPPER_U_U => IS::mul_upper_u_u(vm_state, ins),
            OP::MUL_UPPER_S_U => IS::mul_upper_s_u(vm_state, ins),
            OP::SET_LT_U => IS::set_lt_u(vm_state, ins),
            OP::SET_LT_S => IS::set_lt_s(vm_state, ins),
            OP::CMOV_IZ => IS::cmov_iz(vm_state, ins),
            OP::CMOV_NZ => IS::cmov_nz(vm_state, ins),
        }
    }
}
