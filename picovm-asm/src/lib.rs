//! Textual assembler for the picovm instruction set.
//!
//! Input is a sequence of newline-separated records; blank lines and
//! lines beginning with `#` are skipped. Records are tokenized on
//! whitespace and commas: the first token is a mnemonic, the rest are
//! operands. Registers are written `rN` with 0 ≤ N ≤ 12; immediates are
//! decimal (or `0x`-prefixed hexadecimal) integers, negative only where
//! the operand field is signed.
//!
//! The encoder's contract is that decoding an encoded record yields the
//! record's mnemonic and operands back; the core decoder's word layout is
//! the single source of truth for field positions.

mod error;

pub use error::AsmError;

use picovm_core::program::instruction::opcode::{Opcode, Shape};
use picovm_types::constants::REGISTERS_COUNT;

pub struct Assembler;
impl Assembler {
    /// Assembles a full source text into a packed little-endian image of
    /// 32-bit instruction words.
    pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
        let mut image = Vec::new();
        for (index, record) in source.lines().enumerate() {
            let record = record.trim();
            if record.is_empty() || record.starts_with('#') {
                continue;
            }
            let word = Self::encode_record(record, index + 1)?;
            image.extend_from_slice(&word.to_le_bytes());
        }
        Ok(image)
    }

    /// Encodes a single non-blank record into an instruction word.
    /// `line` is the 1-based source line for error reporting.
    pub fn encode_record(record: &str, line: usize) -> Result<u32, AsmError> {
        let mut tokens = record
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty());

        let mnemonic = tokens.next().unwrap_or_default();
        let op = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::UnknownMnemonic {
            line,
            mnemonic: mnemonic.to_string(),
        })?;
        let operands: Vec<&str> = tokens.collect();

        let base = op as u8 as u32;
        match op.shape() {
            Shape::NoArgs => {
                Self::expect_operands(op, &operands, 0, line)?;
                Ok(base)
            }
            Shape::OneImm => {
                Self::expect_operands(op, &operands, 1, line)?;
                let imm = Self::parse_unsigned(operands[0], 24, line)?;
                Ok(base | (imm << 8))
            }
            Shape::OneRegOneExtImm => {
                Self::expect_operands(op, &operands, 2, line)?;
                let reg = Self::parse_register(operands[0], line)?;
                let imm = Self::parse_unsigned(operands[1], 16, line)?;
                Ok(base | (reg << 8) | (imm << 16))
            }
            Shape::TwoImm => {
                Self::expect_operands(op, &operands, 2, line)?;
                let imm1 = Self::parse_unsigned(operands[0], 8, line)?;
                let imm2 = Self::parse_unsigned(operands[1], 16, line)?;
                Ok(base | (imm1 << 8) | (imm2 << 16))
            }
            Shape::OneOffset => {
                Self::expect_operands(op, &operands, 1, line)?;
                let offset = Self::parse_signed(operands[0], 24, line)?;
                Ok(base | (((offset as u32) & 0xFF_FFFF) << 8))
            }
            Shape::OneRegOneImm => {
                Self::expect_operands(op, &operands, 2, line)?;
                let reg = Self::parse_register(operands[0], line)?;
                let imm = Self::parse_unsigned(operands[1], 20, line)?;
                Ok(base | (reg << 8) | (imm << 12))
            }
            Shape::TwoReg => {
                Self::expect_operands(op, &operands, 2, line)?;
                let reg1 = Self::parse_register(operands[0], line)?;
                let reg2 = Self::parse_register(operands[1], line)?;
                Ok(base | (reg1 << 8) | (reg2 << 12))
            }
            Shape::ThreeReg => {
                Self::expect_operands(op, &operands, 3, line)?;
                let reg1 = Self::parse_register(operands[0], line)?;
                let reg2 = Self::parse_register(operands[1], line)?;
                let reg3 = Self::parse_register(operands[2], line)?;
                Ok(base | (reg1 << 8) | (reg2 << 12) | (reg3 << 16))
            }
        }
    }

    fn expect_operands(
        op: Opcode,
        operands: &[&str],
        expected: usize,
        line: usize,
    ) -> Result<(), AsmError> {
        if operands.len() == expected {
            Ok(())
        } else {
            Err(AsmError::OperandCount {
                line,
                mnemonic: op.mnemonic(),
                expected,
                found: operands.len(),
            })
        }
    }

    fn parse_register(token: &str, line: usize) -> Result<u32, AsmError> {
        let invalid = || AsmError::InvalidRegister {
            line,
            token: token.to_string(),
        };
        let index: u32 = token
            .strip_prefix('r')
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())?;
        if index as usize >= REGISTERS_COUNT {
            return Err(invalid());
        }
        Ok(index)
    }

    fn parse_int(token: &str, line: usize) -> Result<i128, AsmError> {
        let invalid = || AsmError::InvalidImmediate {
            line,
            token: token.to_string(),
        };
        let (negative, body) = match token.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let magnitude = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            Some(hex) => i128::from_str_radix(hex, 16).map_err(|_| invalid())?,
            None => body.parse::<i128>().map_err(|_| invalid())?,
        };
        Ok(if negative { -magnitude } else { magnitude })
    }

    fn parse_unsigned(token: &str, bits: u32, line: usize) -> Result<u32, AsmError> {
        let value = Self::parse_int(token, line)?;
        if value < 0 || value >= (1 << bits) {
            return Err(AsmError::ImmediateOutOfRange { line, value, bits });
        }
        Ok(value as u32)
    }

    fn parse_signed(token: &str, bits: u32, line: usize) -> Result<i32, AsmError> {
        let value = Self::parse_int(token, line)?;
        let bound = 1i128 << (bits - 1);
        if value < -bound || value >= bound {
            return Err(AsmError::ImmediateOutOfRange { line, value, bits });
        }
        Ok(value as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let source = "\n# a comment\n  \ntrap\n";
        let image = Assembler::assemble(source).unwrap();
        assert_eq!(image, vec![0, 0, 0, 0]);
    }

    #[test]
    fn commas_and_whitespace_both_separate_operands() {
        let with_commas = Assembler::assemble("add_64 r0, r1, r2").unwrap();
        let with_spaces = Assembler::assemble("add_64 r0 r1 r2").unwrap();
        assert_eq!(with_commas, with_spaces);
    }

    #[test]
    fn hex_and_decimal_immediates_agree() {
        let hex = Assembler::encode_record("load_imm r0 0x2A", 1).unwrap();
        let dec = Assembler::encode_record("load_imm r0 42", 1).unwrap();
        assert_eq!(hex, dec);
    }

    #[test]
    fn unknown_mnemonics_are_rejected() {
        assert_eq!(
            Assembler::assemble("bogus r0"),
            Err(AsmError::UnknownMnemonic {
                line: 1,
                mnemonic: "bogus".to_string()
            })
        );
    }

    #[test]
    fn operand_arity_is_enforced() {
        assert!(matches!(
            Assembler::assemble("add_64 r0 r1"),
            Err(AsmError::OperandCount {
                expected: 3,
                found: 2,
                ..
            })
        ));
        assert!(matches!(
            Assembler::assemble("trap r0"),
            Err(AsmError::OperandCount { expected: 0, .. })
        ));
    }

    #[test]
    fn registers_above_twelve_are_rejected() {
        assert!(matches!(
            Assembler::assemble("move_reg r13 r0"),
            Err(AsmError::InvalidRegister { .. })
        ));
        assert!(matches!(
            Assembler::assemble("move_reg rx r0"),
            Err(AsmError::InvalidRegister { .. })
        ));
    }

    #[test]
    fn immediates_must_fit_their_fields() {
        // 20-bit one-reg immediate
        assert!(Assembler::assemble("load_imm r0 1048575").is_ok());
        assert!(matches!(
            Assembler::assemble("load_imm r0 1048576"),
            Err(AsmError::ImmediateOutOfRange { bits: 20, .. })
        ));
        // unsigned fields reject negatives
        assert!(matches!(
            Assembler::assemble("load_imm r0 -1"),
            Err(AsmError::ImmediateOutOfRange { .. })
        ));
        // 24-bit signed jump offsets
        assert!(Assembler::assemble("jump -8388608").is_ok());
        assert!(matches!(
            Assembler::assemble("jump 8388608"),
            Err(AsmError::ImmediateOutOfRange { bits: 24, .. })
        ));
        // 8-bit store_imm address
        assert!(matches!(
            Assembler::assemble("store_imm_u8 256 0"),
            Err(AsmError::ImmediateOutOfRange { bits: 8, .. })
        ));
    }

    #[test]
    fn errors_carry_the_source_line() {
        let source = "trap\n\nload_imm r99 1\n";
        assert!(matches!(
            Assembler::assemble(source),
            Err(AsmError::InvalidRegister { line: 3, .. })
        ));
    }

    #[test]
    fn words_are_little_endian() {
        // ecalli 7 → opcode 10, imm 7 in bits 8..31
        let image = Assembler::assemble("ecalli 7").unwrap();
        assert_eq!(image, vec![10, 7, 0, 0]);
    }
}
