//! End-to-end scenarios: assemble a program, run it, inspect the exit
//! pair and the final machine state.

use picovm_asm::Assembler;
use picovm_core::interpreter::{Execution, Interpreter};
use picovm_types::{
    constants::PAGE_SIZE,
    exit_reason::{ExitReason, PanicReason},
};
use std::error::Error;

fn run(source: &str, initial_regs: &[u64], gas_limit: i64) -> Result<Execution, Box<dyn Error>> {
    let image = Assembler::assemble(source)?;
    Ok(Interpreter::execute(&image, initial_regs, gas_limit)?)
}

#[test]
fn simple_add() -> Result<(), Box<dyn Error>> {
    let execution = run(
        "load_imm r0 42\n\
         load_imm r1 100\n\
         add_64 r0 r1 r2\n\
         move_reg r3 r2\n\
         trap\n",
        &[],
        1_000,
    )?;
    assert_eq!(execution.exit_reason, ExitReason::Panic(PanicReason::Trap));
    assert!(execution.exit_data().unwrap().starts_with("Trap"));
    assert_eq!(execution.registers()[0], 42);
    assert_eq!(execution.registers()[1], 100);
    assert_eq!(execution.registers()[2], 142);
    assert_eq!(execution.registers()[3], 142);
    Ok(())
}

#[test]
fn out_of_gas_on_the_first_cycle() -> Result<(), Box<dyn Error>> {
    let execution = run("load_imm r0 1\ntrap\n", &[5, 6], 0)?;
    assert_eq!(execution.exit_reason, ExitReason::OutOfGas);
    assert_eq!(execution.pc(), 0);
    // registers unchanged from the initial vector
    assert_eq!(execution.registers()[0], 5);
    assert_eq!(execution.registers()[1], 6);
    Ok(())
}

#[test]
fn page_fault_on_load_names_the_page() -> Result<(), Box<dyn Error>> {
    // address 0x10000 is far outside the one-page image
    let execution = run("load_u32 r0 0x10000\n", &[], 1_000)?;
    assert_eq!(execution.exit_reason, ExitReason::PageFault(16));
    assert!(execution.exit_data().unwrap().contains("16"));
    Ok(())
}

#[test]
fn host_call_surrenders_control() -> Result<(), Box<dyn Error>> {
    let execution = run("ecalli 7\ntrap\n", &[], 1_000)?;
    assert_eq!(execution.exit_reason, ExitReason::HostCall(7));
    assert!(execution.exit_data().unwrap().contains('7'));
    // pc still addresses the ecalli word; registers untouched
    assert_eq!(execution.pc(), 0);
    assert!(execution.registers().iter().all(|&reg| reg == 0));
    Ok(())
}

#[test]
fn host_call_resume_continues_past_the_ecalli() -> Result<(), Box<dyn Error>> {
    let mut execution = run("ecalli 9\nmove_reg r1 r0\ntrap\n", &[], 1_000)?;
    assert_eq!(execution.exit_reason, ExitReason::HostCall(9));

    // the host writes a result register and re-enters the loop
    execution.state.regs[0] = 1234;
    let exit_reason = Interpreter::resume(&mut execution.state)?;
    assert_eq!(exit_reason, ExitReason::Panic(PanicReason::Trap));
    assert_eq!(execution.state.regs[1], 1234);
    Ok(())
}

#[test]
fn thirty_two_bit_wrap_and_sign_extend() -> Result<(), Box<dyn Error>> {
    // build r0 = 0x7FFFFFFF from 20-bit immediates, then overflow it
    let execution = run(
        "load_imm r0 0xFFFFF\n\
         load_imm r1 11\n\
         shlo_l_64 r0 r1 r3\n\
         load_imm r2 0x7FF\n\
         or r3 r2 r0\n\
         load_imm r1 1\n\
         add_32 r0 r1 r2\n\
         trap\n",
        &[],
        1_000,
    )?;
    assert_eq!(execution.exit_reason, ExitReason::Panic(PanicReason::Trap));
    assert_eq!(execution.registers()[0], 0x7FFF_FFFF);
    assert_eq!(execution.registers()[2], 0xFFFF_FFFF_8000_0000);
    Ok(())
}

#[test]
fn sbrk_grows_memory() -> Result<(), Box<dyn Error>> {
    let execution = run(
        "load_imm r1 4097\n\
         sbrk r0 r1\n\
         trap\n",
        &[],
        1_000,
    )?;
    assert_eq!(execution.exit_reason, ExitReason::Panic(PanicReason::Trap));
    // the 12-byte image occupies one page, so the heap starts at page 1
    assert_eq!(execution.registers()[0], PAGE_SIZE as u64);
    // 4097 bytes need two fresh read-write pages
    assert_eq!(execution.memory().page_count(), 3);
    assert!(execution
        .memory()
        .is_address_range_writable(PAGE_SIZE as u64, 2 * PAGE_SIZE));
    Ok(())
}

#[test]
fn stores_to_sbrk_memory_succeed() -> Result<(), Box<dyn Error>> {
    let execution = run(
        "load_imm r1 4097\n\
         sbrk r0 r1\n\
         store_u8 r0 0\n\
         trap\n",
        &[],
        1_000,
    )?;
    // the store to the freshly mapped base address did not fault
    assert_eq!(execution.exit_reason, ExitReason::Panic(PanicReason::Trap));
    Ok(())
}

#[test]
fn store_then_load_round_trips_each_width() -> Result<(), Box<dyn Error>> {
    // r0 holds the heap base; the one-reg-one-imm store writes the low
    // bytes of that same register, so each load must read them back.
    for (store, load, width) in [
        ("store_u8", "load_u8", 1usize),
        ("store_u16", "load_u16", 2),
        ("store_u32", "load_u32", 4),
        ("store_u64", "load_u64", 8),
    ] {
        let source = format!(
            "load_imm r1 64\n\
             sbrk r0 r1\n\
             {store} r0 16\n\
             move_reg r2 r0\n\
             {load} r2 16\n\
             trap\n"
        );
        let execution = run(&source, &[], 1_000)?;
        assert_eq!(execution.exit_reason, ExitReason::Panic(PanicReason::Trap));
        let base = PAGE_SIZE as u64;
        let expected = base & ((1u128 << (8 * width as u32)) - 1) as u64;
        assert_eq!(execution.registers()[2], expected, "width {width}");
        let stored = execution.memory().read_bytes(base + 16, width)?;
        assert_eq!(stored, base.to_le_bytes()[..width].to_vec());
    }
    Ok(())
}

#[test]
fn straight_line_instructions_step_by_four() -> Result<(), Box<dyn Error>> {
    let execution = run(
        "fallthrough\n\
         load_imm r0 1\n\
         move_reg r1 r0\n\
         ecalli 0\n",
        &[],
        1_000,
    )?;
    // three straight-line instructions retire before the ecalli at 12
    assert_eq!(execution.pc(), 12);
    Ok(())
}

#[test]
fn jumps_branch_forwards_and_backwards() -> Result<(), Box<dyn Error>> {
    // pc 0 jumps over the trap to pc 8, which jumps back onto it
    let execution = run(
        "jump 8\n\
         trap\n\
         jump -4\n",
        &[],
        1_000,
    )?;
    assert_eq!(execution.exit_reason, ExitReason::Panic(PanicReason::Trap));
    assert_eq!(execution.pc(), 4);
    Ok(())
}

#[test]
fn jump_ind_lands_on_the_aligned_boundary() -> Result<(), Box<dyn Error>> {
    // r0 = 6: the indirect target 6 + 3 = 9 aligns down to 8
    let execution = run(
        "jump_ind r0 3\n\
         trap\n\
         ecalli 5\n",
        &[6],
        1_000,
    )?;
    assert_eq!(execution.exit_reason, ExitReason::HostCall(5));
    assert_eq!(execution.pc(), 8);
    Ok(())
}
