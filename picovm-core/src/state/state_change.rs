use crate::{
    error::VMCoreError,
    gas::GasCharger,
    state::vm_state::VMState,
};
use picovm_types::{
    common::{MemAddress, RegValue, SignedGas, UnsignedGas},
    constants::REGISTERS_COUNT,
};

/// A deferred memory store produced by a single instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemWrite {
    pub address: MemAddress,
    pub data: Vec<u8>,
}

impl MemWrite {
    pub fn new(address: MemAddress, data: Vec<u8>) -> Self {
        Self { address, data }
    }
}

/// VM state change set resulting from a single instruction execution.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VMStateChange {
    pub register_write: Option<(usize, RegValue)>,
    pub memory_write: Option<MemWrite>,
    pub new_pc: RegValue,
    pub gas_charge: UnsignedGas,
}

pub struct VMStateMutator;
impl VMStateMutator {
    /// Mutates the VM state from the change set produced by single-step
    /// instruction execution functions.
    ///
    /// The memory write is applied first: its permission check can fail
    /// with a page fault, and in that case no register, pc or gas change
    /// becomes visible, keeping single-instruction stores atomic.
    ///
    /// # Returns
    ///
    /// The remaining gas after applying the charge, which may be negative.
    pub fn apply_state_change(
        vm_state: &mut VMState,
        change: &VMStateChange,
    ) -> Result<SignedGas, VMCoreError> {
        // Apply memory change
        if let Some(MemWrite { address, data }) = &change.memory_write {
            vm_state.memory.write_bytes(*address, data)?;
        }

        // Apply register change
        if let Some((reg_index, new_val)) = change.register_write {
            if reg_index >= REGISTERS_COUNT {
                return Err(VMCoreError::InvalidRegIndex(reg_index));
            }
            vm_state.regs[reg_index] = new_val;
        }

        // Apply pc change
        vm_state.pc = change.new_pc;

        // Apply gas change
        let post_gas = GasCharger::apply_gas_cost(vm_state, change.gas_charge);
        Ok(post_gas)
    }
}
