use quartz_core::cpu::z80::{decode, Op};
mod common;
use common::TestMemory;

fn decode_at_zero(bytes: &[u8]) -> quartz_core::cpu::z80::Instruction {
    let mut mem = TestMemory::new();
    mem.load(0, bytes);
    decode(bytes[0], &mut mem, 0)
}

fn is_unimplemented(op: &Op) -> bool {
    matches!(op, Op::Unimplemented { .. })
}

#[test]
fn test_every_unprefixed_opcode_decodes() {
    for opcode in 0..=255u8 {
        if matches!(opcode, 0xCB | 0xDD | 0xED | 0xFD) {
            continue;
        }
        let instr = decode_at_zero(&[opcode, 0x00, 0x00]);
        assert!(!is_unimplemented(&instr.op), "opcode {opcode:02X}");
        assert!((1..=3).contains(&instr.size), "size of {opcode:02X}");
        assert!(instr.base_cycles() >= 4);
        assert!(!instr.to_string().is_empty());
    }
}

#[test]
fn test_every_cb_opcode_decodes() {
    for opcode in 0..=255u8 {
        let instr = decode_at_zero(&[0xCB, opcode]);
        assert!(!is_unimplemented(&instr.op), "CB {opcode:02X}");
        assert_eq!(instr.size, 2);
        let expected = match (opcode >> 6, opcode & 7) {
            (_, z) if z != 6 => 8,
            (1, _) => 12,
            _ => 15,
        };
        assert_eq!(instr.base_cycles(), expected, "CB {opcode:02X}");
    }
}

#[test]
fn test_every_index_cb_opcode_decodes() {
    for prefix in [0xDD, 0xFD] {
        for opcode in 0..=255u8 {
            let instr = decode_at_zero(&[prefix, 0xCB, 0x10, opcode]);
            assert_eq!(instr.size, 4);
            let expected = if opcode >> 6 == 1 { 20 } else { 23 };
            assert_eq!(instr.base_cycles(), expected, "{prefix:02X} CB d {opcode:02X}");
        }
    }
}

#[test]
fn test_ed_table_coverage() {
    let implemented: Vec<u8> = (0..=255u8)
        .filter(|&op| !is_unimplemented(&decode_at_zero(&[0xED, op, 0x00, 0x00]).op))
        .collect();
    assert_eq!(implemented.len(), 78);
    assert!(!implemented.contains(&0x77));
    assert!(!implemented.contains(&0x7F));
    assert!(implemented.contains(&0xB3), "OTIR");
    assert!(implemented.contains(&0x4C), "NEG mirror");
}

#[test]
fn test_index_prefix_adds_one_fetch() {
    for opcode in 0..=255u8 {
        if matches!(opcode, 0xCB | 0xDD | 0xED | 0xFD) {
            continue;
        }
        let plain = decode_at_zero(&[opcode, 0x00, 0x00]);
        let indexed = decode_at_zero(&[0xDD, opcode, 0x00, 0x00]);
        assert_eq!(indexed.cycles.fetches, plain.cycles.fetches + 1, "DD {opcode:02X}");
        assert!(indexed.base_cycles() >= plain.base_cycles() + 4, "DD {opcode:02X}");
    }
}

#[test]
fn test_disassembly_samples() {
    let cases: &[(&[u8], &str)] = &[
        (&[0x00], "NOP"),
        (&[0x76], "HALT"),
        (&[0xC3, 0x34, 0x12], "JP $1234"),
        (&[0xFD, 0x21, 0x00, 0x80], "LD IY,$8000"),
        (&[0xED, 0xB0], "LDIR"),
        (&[0xDD, 0xCB, 0x02, 0x46], "BIT 0,(IX+$02)"),
    ];
    for (bytes, text) in cases {
        assert_eq!(decode_at_zero(bytes).to_string(), *text);
    }
}
