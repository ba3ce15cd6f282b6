use crate::common::{HostCallId, PageIndex, RegValue};
use std::fmt::{self, Display, Formatter};

/// VM invocation exit reasons.
///
/// `Continue` is the non-terminal tag produced by single-step execution;
/// a finished invocation always carries one of the five terminal tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExitReason {
    #[default]
    Continue,
    /// Reserved for a future `ret`/`halt`; no opcode signals it today.
    RegularHalt,
    Panic(PanicReason),
    OutOfGas,
    /// Carries the first page in the accessed range lacking the required
    /// permission.
    PageFault(PageIndex),
    /// Carries the immediate-encoded host-call identifier. The program
    /// counter still addresses the `ecalli` word when this is surfaced.
    HostCall(HostCallId),
}

/// Causes of a `Panic` exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanicReason {
    /// A `trap` instruction was executed.
    Trap,
    /// The opcode byte is not present in the instruction table.
    InvalidOpcode(u8),
    /// The instruction word carried operand fields that failed validation.
    MalformedInstruction(u8),
    /// The 4-byte instruction fetch at the given pc failed.
    InstructionFetch(RegValue),
}

impl ExitReason {
    /// True for the five terminal tags, false for `Continue`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }

    /// Descriptive payload of the exit, if the tag carries one.
    pub fn data(&self) -> Option<String> {
        match self {
            Self::Continue | Self::RegularHalt | Self::OutOfGas => None,
            Self::Panic(cause) => Some(cause.to_string()),
            Self::PageFault(page_index) => Some(format!("page index {page_index}")),
            Self::HostCall(id) => Some(format!("host call id {id}")),
        }
    }
}

impl Display for ExitReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::RegularHalt => write!(f, "regular halt"),
            Self::Panic(cause) => write!(f, "panic: {cause}"),
            Self::OutOfGas => write!(f, "out of gas"),
            Self::PageFault(page_index) => write!(f, "page fault at page index {page_index}"),
            Self::HostCall(id) => write!(f, "host call id {id}"),
        }
    }
}

impl Display for PanicReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trap => write!(f, "Trap instruction executed"),
            Self::InvalidOpcode(byte) => write!(f, "invalid opcode {byte}"),
            Self::MalformedInstruction(byte) => {
                write!(f, "malformed operands for opcode {byte}")
            }
            Self::InstructionFetch(pc) => write!(f, "instruction fetch failed at pc {pc}"),
        }
    }
}
