use crate::error::VMCoreError;
use num_enum::TryFromPrimitive;
use picovm_types::common::UnsignedGas;

/// Operand layout families determining how the 24 high bits of an
/// instruction word decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// No operand fields.
    NoArgs,
    /// Bits 8..31: 24-bit unsigned immediate.
    OneImm,
    /// Bits 8..11: register; bits 16..31: 16-bit unsigned immediate.
    OneRegOneExtImm,
    /// Bits 8..15: 8-bit immediate; bits 16..31: 16-bit immediate.
    TwoImm,
    /// Bits 8..31: 24-bit signed offset.
    OneOffset,
    /// Bits 8..11: register; bits 12..31: 20-bit unsigned immediate.
    OneRegOneImm,
    /// Bits 8..11: first register; bits 12..15: second register.
    TwoReg,
    /// Bits 8..11, 12..15, 16..19: three registers.
    ThreeReg,
}

/// VM Opcodes
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[allow(non_camel_case_types)]
pub enum Opcode {
    TRAP = 0,
    FALLTHROUGH = 1,
    ECALLI = 10,
    LOAD_IMM_64 = 20,
    STORE_IMM_U8 = 30,
    STORE_IMM_U16 = 31,
    STORE_IMM_U32 = 32,
    STORE_IMM_U64 = 33,
    JUMP = 40,
    JUMP_IND = 50,
    LOAD_IMM = 51,
    LOAD_U8 = 52,
    LOAD_I8 = 53,
    LOAD_U16 = 54,
    LOAD_I16 = 55,
    LOAD_U32 = 56,
    LOAD_I32 = 57,
    LOAD_U64 = 58,
    STORE_U8 = 59,
    STORE_U16 = 60,
    STORE_U32 = 61,
    STORE_U64 = 62,
    MOVE_REG = 100,
    SBRK = 101,
    COUNT_SET_BITS_64 = 102,
    COUNT_SET_BITS_32 = 103,
    LEADING_ZERO_BITS_64 = 104,
    LEADING_ZERO_BITS_32 = 105,
    TRAILING_ZERO_BITS_64 = 106,
    TRAILING_ZERO_BITS_32 = 107,
    SIGN_EXTEND_8 = 108,
    SIGN_EXTEND_16 = 109,
    ZERO_EXTEND_16 = 110,
    REVERSE_BYTES = 111,
    ADD_32 = 190,
    SUB_32 = 191,
    MUL_32 = 192,
    DIV_U_32 = 193,
    DIV_S_32 = 194,
    REM_U_32 = 195,
    REM_S_32 = 196,
    SHLO_L_32 = 197,
    SHLO_R_32 = 198,
    SHAR_R_32 = 199,
    ADD_64 = 200,
    SUB_64 = 201,
    MUL_64 = 202,
    DIV_U_64 = 203,
    DIV_S_64 = 204,
    REM_U_64 = 205,
    REM_S_64 = 206,
    SHLO_L_64 = 207,
    SHLO_R_64 = 208,
    SHAR_R_64 = 209,
    AND = 210,
    XOR = 211,
    OR = 212,
    MUL_UPPER_S_S = 213,
    MUL_UPPER_U_U = 214,
    MUL_UPPER_S_U = 215,
    SET_LT_U = 216,
    SET_LT_S = 217,
    CMOV_IZ = 218,
    CMOV_NZ = 219,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Result<Self, VMCoreError> {
        Self::try_from(value).map_err(|_| VMCoreError::InvalidOpcode(value))
    }

    /// Operand layout family of the opcode.
    pub fn shape(&self) -> Shape {
        use Opcode::*;
        match self {
            TRAP | FALLTHROUGH => Shape::NoArgs,
            ECALLI => Shape::OneImm,
            LOAD_IMM_64 => Shape::OneRegOneExtImm,
            STORE_IMM_U8 | STORE_IMM_U16 | STORE_IMM_U32 | STORE_IMM_U64 => Shape::TwoImm,
            JUMP => Shape::OneOffset,
            JUMP_IND | LOAD_IMM | LOAD_U8 | LOAD_I8 | LOAD_U16 | LOAD_I16 | LOAD_U32 | LOAD_I32
            | LOAD_U64 | STORE_U8 | STORE_U16 | STORE_U32 | STORE_U64 => Shape::OneRegOneImm,
            MOVE_REG | SBRK | COUNT_SET_BITS_64 | COUNT_SET_BITS_32 | LEADING_ZERO_BITS_64
            | LEADING_ZERO_BITS_32 | TRAILING_ZERO_BITS_64 | TRAILING_ZERO_BITS_32
            | SIGN_EXTEND_8 | SIGN_EXTEND_16 | ZERO_EXTEND_16 | REVERSE_BYTES => Shape::TwoReg,
            ADD_32 | SUB_32 | MUL_32 | DIV_U_32 | DIV_S_32 | REM_U_32 | REM_S_32 | SHLO_L_32
            | SHLO_R_32 | SHAR_R_32 | ADD_64 | SUB_64 | MUL_64 | DIV_U_64 | DIV_S_64 | REM_U_64
            | REM_S_64 | SHLO_L_64 | SHLO_R_64 | SHAR_R_64 | AND | XOR | OR | MUL_UPPER_S_S
            | MUL_UPPER_U_U | MUL_UPPER_S_U | SET_LT_U | SET_LT_S | CMOV_IZ | CMOV_NZ => {
                Shape::ThreeReg
            }
        }
    }

    /// Gas charged for executing one instance of the opcode. The schedule
    /// is uniformly zero today; the driver already honors per-instruction
    /// costs, so a real cost table can be dropped in here.
    pub fn gas_cost(&self) -> UnsignedGas {
        0
    }

    /// Textual mnemonic as accepted and emitted by the assembler.
    pub fn mnemonic(&self) -> &'static str {
        use Opcode::*;
        match self {
            TRAP => "trap",
            FALLTHROUGH => "fallthrough",
            ECALLI => "ecalli",
            LOAD_IMM_64 => "load_imm_64",
            STORE_IMM_U8 => "store_imm_u8",
            STORE_IMM_U16 => "store_imm_u16",
            STORE_IMM_U32 => "store_imm_u32",
            STORE_IMM_U64 => "store_imm_u64",
            JUMP => "jump",
            JUMP_IND => "jump_ind",
            LOAD_IMM => "load_imm",
            LOAD_U8 => "load_u8",
            LOAD_I8 => "load_i8",
            LOAD_U16 => "load_u16",
            LOAD_I16 => "load_i16",
            LOAD_U32 => "load_u32",
            LOAD_I32 => "load_i32",
            LOAD_U64 => "load_u64",
            STORE_U8 => "store_u8",
            STORE_U16 => "store_u16",
            STORE_U32 => "store_u32",
            STORE_U64 => "store_u64",
            MOVE_REG => "move_reg",
            SBRK => "sbrk",
            COUNT_SET_BITS_64 => "count_set_bits_64",
            COUNT_SET_BITS_32 => "count_set_bits_32",
            LEADING_ZERO_BITS_64 => "leading_zero_bits_64",
            LEADING_ZERO_BITS_32 => "leading_zero_bits_32",
            TRAILING_ZERO_BITS_64 => "trailing_zero_bits_64",
            TRAILING_ZERO_BITS_32 => "trailing_zero_bits_32",
            SIGN_EXTEND_8 => "sign_extend_8",
            SIGN_EXTEND_16 => "sign_extend_16",
            ZERO_EXTEND_16 => "zero_extend_16",
            REVERSE_BYTES => "reverse_bytes",
            ADD_32 => "add_32",
            SUB_32 => "sub_32",
            MUL_32 => "mul_32",
            DIV_U_32 => "div_u_32",
            DIV_S_32 => "div_s_32",
            REM_U_32 => "rem_u_32",
            REM_S_32 => "rem_s_32",
            SHLO_L_32 => "shlo_l_32",
            SHLO_R_32 => "shlo_r_32",
            SHAR_R_32 => "shar_r_32",
            ADD_64 => "add_64",
            SUB_64 => "sub_64",
            MUL_64 => "mul_64",
            DIV_U_64 => "div_u_64",
            DIV_S_64 => "div_s_64",
            REM_U_64 => "rem_u_64",
            REM_S_64 => "rem_s_64",
            SHLO_L_64 => "shlo_l_64",
            SHLO_R_64 => "shlo_r_64",
            SHAR_R_64 => "shar_r_64",
            AND => "and",
            XOR => "xor",
            OR => "or",
            MUL_UPPER_S_S => "mul_upper_s_s",
            MUL_UPPER_U_U => "mul_upper_u_u",
            MUL_UPPER_S_U => "mul_upper_s_u",
            SET_LT_U => "set_lt_u",
            SET_LT_S => "set_lt_s",
            CMOV_IZ => "cmov_iz",
            CMOV_NZ => "cmov_nz",
        }
    }

    /// Reverse lookup used by the assembler.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic() == mnemonic)
    }

    /// Every opcode in the instruction table, in numbering order.
    pub const ALL: [Opcode; 64] = {
        use Opcode::*;
        [
            TRAP,
            FALLTHROUGH,
            ECALLI,
            LOAD_IMM_64,
            STORE_IMM_U8,
            STORE_IMM_U16,
            STORE_IMM_U32,
            STORE_IMM_U64,
            JUMP,
            JUMP_IND,
            LOAD_IMM,
            LOAD_U8,
            LOAD_I8,
            LOAD_U16,
            LOAD_I16,
            LOAD_U32,
            LOAD_I32,
            LOAD_U64,
            STORE_U8,
            STORE_U16,
            STORE_U32,
            STORE_U64,
            MOVE_REG,
            SBRK,
            COUNT_SET_BITS_64,
            COUNT_SET_BITS_32,
            LEADING_ZERO_BITS_64,
            LEADING_ZERO_BITS_32,
            TRAILING_ZERO_BITS_64,
            TRAILING_ZERO_BITS_32,
            SIGN_EXTEND_8,
            SIGN_EXTEND_16,
            ZERO_EXTEND_16,
            REVERSE_BYTES,
            ADD_32,
            SUB_32,
            MUL_32,
            DIV_U_32,
            DIV_S_32,
            REM_U_32,
            REM_S_32,
            SHLO_L_32,
            SHLO_R_32,
            SHAR_R_32,
            ADD_64,
            SUB_64,
            MUL_64,
            DIV_U_64,
            DIV_S_64,
            REM_U_64,
            REM_S_64,
            SHLO_L_64,
            SHLO_R_64,
            SHAR_R_64,
            AND,
            XOR,
            OR,
            MUL_UPPER_S_S,
            MUL_UPPER_U_U,
            MUL_UPPER_S_U,
            SET_LT_U,
            SET_LT_S,
            CMOV_IZ,
            CMOV_NZ,
        ]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_matches_the_instruction_table() {
        assert_eq!(Opcode::TRAP as u8, 0);
        assert_eq!(Opcode::FALLTHROUGH as u8, 1);
        assert_eq!(Opcode::ECALLI as u8, 10);
        assert_eq!(Opcode::LOAD_IMM_64 as u8, 20);
        assert_eq!(Opcode::STORE_IMM_U64 as u8, 33);
        assert_eq!(Opcode::JUMP as u8, 40);
        assert_eq!(Opcode::JUMP_IND as u8, 50);
        assert_eq!(Opcode::LOAD_U64 as u8, 58);
        assert_eq!(Opcode::STORE_U64 as u8, 62);
        assert_eq!(Opcode::MOVE_REG as u8, 100);
        assert_eq!(Opcode::SBRK as u8, 101);
        assert_eq!(Opcode::REVERSE_BYTES as u8, 111);
        assert_eq!(Opcode::ADD_32 as u8, 190);
        assert_eq!(Opcode::SHAR_R_32 as u8, 199);
        assert_eq!(Opcode::ADD_64 as u8, 200);
        assert_eq!(Opcode::SHAR_R_64 as u8, 209);
        assert_eq!(Opcode::AND as u8, 210);
        assert_eq!(Opcode::CMOV_NZ as u8, 219);
    }

    #[test]
    fn mnemonic_lookup_round_trips() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("bogus"), None);
    }

    #[test]
    fn unknown_bytes_fail_lookup() {
        assert!(Opcode::from_u8(2).is_err());
        assert!(Opcode::from_u8(63).is_err());
        assert!(Opcode::from_u8(255).is_err());
        assert!(Opcode::from_u8(101).is_ok());
    }
}
