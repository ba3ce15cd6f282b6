/// 64-bit register values
pub type RegValue = u64;

/// 64-bit memory addresses
pub type MemAddress = u64;

/// Index of a page in the memory map
pub type PageIndex = u64;

/// Identifier surrendered to the host on an `ecalli` exit
pub type HostCallId = u64;

/// Signed gas counter values
pub type SignedGas = i64;

/// Unsigned per-instruction gas charges
pub type UnsignedGas = u64;
