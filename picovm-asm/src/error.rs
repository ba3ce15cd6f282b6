use thiserror::Error;

/// Assembler Error Codes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },
    #[error("line {line}: `{mnemonic}` expects {expected} operand(s), found {found}")]
    OperandCount {
        line: usize,
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid register `{token}` (expected r0..r12)")]
    InvalidRegister { line: usize, token: String },
    #[error("line {line}: invalid immediate `{token}`")]
    InvalidImmediate { line: usize, token: String },
    #[error("line {line}: immediate {value} does not fit in {bits} bits")]
    ImmediateOutOfRange { line: usize, value: i128, bits: u32 },
}
