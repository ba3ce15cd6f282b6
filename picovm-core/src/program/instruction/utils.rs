#[macro_export]
macro_rules! continue_with_reg_write {
    ($vm_state:expr, $ins:expr, $reg_idx:expr, $reg_val:expr) => {
        Ok(SingleStepResult {
            exit_reason: ExitReason::Continue,
            state_change: VMStateChange {
                new_pc: Interpreter::next_pc($vm_state),
                register_write: Some(($reg_idx, $reg_val)),
                gas_charge: $ins.op.gas_cost(),
                ..Default::default()
            },
        })
    };
}

#[macro_export]
macro_rules! continue_with_mem_write {
    ($vm_state:expr, $ins:expr, $address:expr, $data:expr) => {
        Ok(SingleStepResult {
            exit_reason: ExitReason::Continue,
            state_change: VMStateChange {
                memory_write: Some(MemWrite::new($address, $data)),
                new_pc: Interpreter::next_pc($vm_state),
                gas_charge: $ins.op.gas_cost(),
                ..Default::default()
            },
        })
    };
}

/// Terminal page-fault result; the pc stays at the faulting instruction.
#[macro_export]
macro_rules! mem_page_fault {
    ($vm_state:expr, $page_index:expr) => {
        Ok(SingleStepResult {
            exit_reason: ExitReason::PageFault($page_index),
            state_change: VMStateChange {
                new_pc: $vm_state.pc,
                ..Default::default()
            },
        })
    };
}

/// Reads memory inside an execution function, converting a failed access
/// into a page-fault result for the enclosing function.
#[macro_export]
macro_rules! mem_read {
    ($vm_state:expr, $address:expr, $length:expr) => {
        match $vm_state.memory.read_bytes($address, $length) {
            Ok(bytes) => bytes,
            Err(e) => return $crate::mem_page_fault!($vm_state, e.page_index()),
        }
    };
}

#[macro_export]
macro_rules! jump_result {
    ($ins:expr, $target:expr) => {
        Ok(SingleStepResult {
            exit_reason: ExitReason::Continue,
            state_change: VMStateChange {
                new_pc: $target,
                gas_charge: $ins.op.gas_cost(),
                ..Default::default()
            },
        })
    };
}
