use crate::state::vm_state::VMState;
use picovm_types::common::{SignedGas, UnsignedGas};

pub struct GasCharger;
impl GasCharger {
    /// Deducts the gas counter of `VMState` by the given `gas_charge`,
    /// returning the posterior gas. The counter is allowed to go negative;
    /// the driver detects exhaustion at the top of the next fetch cycle.
    pub fn apply_gas_cost(vm_state: &mut VMState, gas_charge: UnsignedGas) -> SignedGas {
        vm_state.gas_counter = vm_state
            .gas_counter
            .saturating_sub_unsigned(gas_charge);
        vm_state.gas_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_decrements_and_saturates() {
        let mut vm_state = VMState::new(10);
        assert_eq!(GasCharger::apply_gas_cost(&mut vm_state, 3), 7);
        assert_eq!(vm_state.gas_counter, 7);
        assert_eq!(GasCharger::apply_gas_cost(&mut vm_state, u64::MAX), i64::MIN);
    }
}
