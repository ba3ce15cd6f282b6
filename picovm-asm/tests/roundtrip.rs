//! The encoder's one obligation: decoding an encoded record yields the
//! record's mnemonic and operands back.

use picovm_asm::Assembler;
use picovm_core::program::instruction::{
    opcode::{Opcode, Shape},
    Instruction,
};

fn decode(word: u32) -> Instruction {
    Instruction::from_word(word, 0).expect("encoder produced an undecodable word")
}

#[test]
fn every_mnemonic_round_trips() {
    for op in Opcode::ALL {
        let record = match op.shape() {
            Shape::NoArgs => op.mnemonic().to_string(),
            Shape::OneImm | Shape::OneOffset => format!("{} 19", op.mnemonic()),
            Shape::OneRegOneExtImm | Shape::OneRegOneImm => {
                format!("{} r7 1234", op.mnemonic())
            }
            Shape::TwoImm => format!("{} 77 1234", op.mnemonic()),
            Shape::TwoReg => format!("{} r3 r11", op.mnemonic()),
            Shape::ThreeReg => format!("{} r1 r2 r3", op.mnemonic()),
        };
        let word = Assembler::encode_record(&record, 1).unwrap();
        let ins = decode(word);
        assert_eq!(ins.op, op, "opcode survived encoding of `{record}`");
        match op.shape() {
            Shape::NoArgs => {
                assert_eq!(ins.rs1, None);
                assert_eq!(ins.imm1, None);
            }
            Shape::OneImm => assert_eq!(ins.imm1, Some(19)),
            // the decoder resolves offsets against the fetch pc, 0 here
            Shape::OneOffset => assert_eq!(ins.imm1, Some(19)),
            Shape::OneRegOneExtImm | Shape::OneRegOneImm => {
                assert_eq!(ins.rs1, Some(7));
                assert_eq!(ins.imm1, Some(1234));
            }
            Shape::TwoImm => {
                assert_eq!(ins.imm1, Some(77));
                assert_eq!(ins.imm2, Some(1234));
            }
            Shape::TwoReg => {
                assert_eq!(ins.rd, Some(3));
                assert_eq!(ins.rs1, Some(11));
            }
            Shape::ThreeReg => {
                assert_eq!(ins.rs1, Some(1));
                assert_eq!(ins.rs2, Some(2));
                assert_eq!(ins.rd, Some(3));
            }
        }
    }
}

#[test]
fn negative_jump_offsets_round_trip() {
    let word = Assembler::encode_record("jump -8", 1).unwrap();
    let ins = decode(word);
    // decoded at pc 0, the sign-extended offset wraps below zero
    assert_eq!(ins.imm1, Some((-8i64) as u64));

    let word = Assembler::encode_record("jump -8", 1).unwrap();
    let ins = Instruction::from_word(word, 32).unwrap();
    assert_eq!(ins.imm1, Some(24));
}

#[test]
fn field_extremes_round_trip() {
    let word = Assembler::encode_record("ecalli 16777215", 1).unwrap();
    assert_eq!(decode(word).imm1, Some(0xFF_FFFF));

    let word = Assembler::encode_record("load_imm r12 1048575", 1).unwrap();
    let ins = decode(word);
    assert_eq!(ins.rs1, Some(12));
    assert_eq!(ins.imm1, Some(0xFFFFF));

    let word = Assembler::encode_record("load_imm_64 r0 65535", 1).unwrap();
    assert_eq!(decode(word).imm1, Some(0xFFFF));

    let word = Assembler::encode_record("store_imm_u64 255 65535", 1).unwrap();
    let ins = decode(word);
    assert_eq!(ins.imm1, Some(255));
    assert_eq!(ins.imm2, Some(65535));
}

#[test]
fn assembled_images_pack_words_densely() {
    let image = Assembler::assemble("trap\nfallthrough\necalli 1\n").unwrap();
    assert_eq!(image.len(), 12);
    assert_eq!(&image[0..4], &[0, 0, 0, 0]);
    assert_eq!(&image[4..8], &[1, 0, 0, 0]);
    assert_eq!(&image[8..12], &[10, 1, 0, 0]);
}
