//! Opcode decoding.
//!
//! Opcodes are split into x/y/z/p/q fields (x = bits 7-6, y = bits 5-3,
//! z = bits 2-0, p = y >> 1, q = y & 1) and matched per prefix table. A
//! DD/FD prefix reuses the unprefixed table with IX/IY standing in for HL.

use crate::core::Memory;
use crate::cpu::z80::cycles::CycleShape;
use crate::cpu::z80::instruction::{
    AluOp, BlockOp, Condition, Direction, Instruction, Op, Operand8, ShiftOp,
};
use crate::cpu::z80::registers::{IndexMode, Reg8, RegPair};

/// Reads operand bytes after the opcode and remembers what it saw.
struct Cursor<'a, M: Memory + ?Sized> {
    mem: &'a mut M,
    start: u16,
    len: u16,
    bytes: [u8; 4],
}

impl<'a, M: Memory + ?Sized> Cursor<'a, M> {
    fn new(mem: &'a mut M, start: u16, opcode: u8) -> Self {
        Self {
            mem,
            start,
            len: 1,
            bytes: [opcode, 0, 0, 0],
        }
    }

    fn next_byte(&mut self) -> u8 {
        let value = self.mem.read_byte(self.start.wrapping_add(self.len));
        if let Some(slot) = self.bytes.get_mut(usize::from(self.len)) {
            *slot = value;
        }
        self.len += 1;
        value
    }

    fn next_word(&mut self) -> u16 {
        let low = self.next_byte();
        let high = self.next_byte();
        u16::from_le_bytes([low, high])
    }

    fn finish(self, op: Op, cycles: CycleShape) -> Instruction {
        Instruction {
            op,
            address: self.start,
            size: self.len,
            cycles,
            bytes: self.bytes,
        }
    }
}

/// Decode the instruction whose first byte `opcode` was fetched from `pc`.
/// Operand bytes are read from `mem` starting at `pc + 1`. Never fails:
/// unsupported encodings become [`Op::Unimplemented`].
pub fn decode<M: Memory + ?Sized>(opcode: u8, mem: &mut M, pc: u16) -> Instruction {
    let mut cur = Cursor::new(mem, pc, opcode);
    match opcode {
        0xCB => {
            let op = cur.next_byte();
            let (op, shape) = decode_cb(op);
            cur.finish(op, shape)
        }
        0xED => {
            let op = cur.next_byte();
            decode_ed(op, cur)
        }
        0xDD | 0xFD => {
            let mode = if opcode == 0xDD { IndexMode::IX } else { IndexMode::IY };
            let next = cur.next_byte();
            if matches!(next, 0xDD | 0xFD | 0xED) {
                // The prefix is dropped; the next byte starts a new instruction.
                cur.len = 1;
                return cur.finish(Op::Nop, CycleShape::M1);
            }
            if next == 0xCB {
                decode_index_cb(mode, cur)
            } else {
                decode_main(next, mode, CycleShape::M1.fetch(), cur)
            }
        }
        _ => decode_main(opcode, IndexMode::HL, CycleShape::M1, cur),
    }
}

/// Memory operand for field value 6: (HL), or (IX+d)/(IY+d) with the
/// displacement read and address computation charged to `shape`.
fn memory_operand<M: Memory + ?Sized>(
    mode: IndexMode,
    cur: &mut Cursor<'_, M>,
    shape: CycleShape,
) -> (Operand8, CycleShape) {
    match mode {
        IndexMode::HL => (Operand8::Indirect(RegPair::HL), shape),
        _ => {
            let disp = cur.next_byte() as i8;
            (Operand8::Indexed(mode, disp), shape.read().internal(5))
        }
    }
}

fn reg_operand(index: u8, mode: IndexMode) -> Operand8 {
    // Index 6 never reaches here.
    Operand8::Reg(Reg8::from_index(index, mode).unwrap_or(Reg8::A))
}

fn decode_main<M: Memory + ?Sized>(
    opcode: u8,
    mode: IndexMode,
    m1: CycleShape,
    mut cur: Cursor<'_, M>,
) -> Instruction {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 0x07;
    let z = opcode & 0x07;
    let p = y >> 1;
    let q = y & 0x01;
    let hl = mode.pair();

    let (op, shape) = match x {
        0 => match z {
            0 => match y {
                0 => (Op::Nop, m1),
                1 => (Op::ExAf, m1),
                2 => {
                    let offset = cur.next_byte() as i8;
                    (Op::Djnz(offset), m1.internal(1).read())
                }
                3 => {
                    let offset = cur.next_byte() as i8;
                    (Op::Jr { cond: None, offset }, m1.read().internal(5))
                }
                _ => {
                    let offset = cur.next_byte() as i8;
                    let cond = Some(Condition::from_index(y - 4));
                    (Op::Jr { cond, offset }, m1.read())
                }
            },
            1 => {
                let pair = RegPair::from_rp(p, mode);
                if q == 0 {
                    let value = cur.next_word();
                    (Op::Ld16 { dst: pair, value }, m1.reads(2))
                } else {
                    (Op::Add16 { dst: hl, src: pair }, m1.internal(7))
                }
            }
            2 => match (q, p) {
                (0, 0) => (
                    Op::Ld8 { dst: Operand8::Indirect(RegPair::BC), src: Operand8::Reg(Reg8::A) },
                    m1.write(),
                ),
                (0, 1) => (
                    Op::Ld8 { dst: Operand8::Indirect(RegPair::DE), src: Operand8::Reg(Reg8::A) },
                    m1.write(),
                ),
                (0, 2) => {
                    let addr = cur.next_word();
                    (Op::Ld16Store { addr, src: hl }, m1.reads(2).writes(2))
                }
                (0, _) => {
                    let addr = cur.next_word();
                    (
                        Op::Ld8 { dst: Operand8::Absolute(addr), src: Operand8::Reg(Reg8::A) },
                        m1.reads(2).write(),
                    )
                }
                (_, 0) => (
                    Op::Ld8 { dst: Operand8::Reg(Reg8::A), src: Operand8::Indirect(RegPair::BC) },
                    m1.read(),
                ),
                (_, 1) => (
                    Op::Ld8 { dst: Operand8::Reg(Reg8::A), src: Operand8::Indirect(RegPair::DE) },
                    m1.read(),
                ),
                (_, 2) => {
                    let addr = cur.next_word();
                    (Op::Ld16Load { dst: hl, addr }, m1.reads(4))
                }
                (_, _) => {
                    let addr = cur.next_word();
                    (
                        Op::Ld8 { dst: Operand8::Reg(Reg8::A), src: Operand8::Absolute(addr) },
                        m1.reads(3),
                    )
                }
            },
            3 => {
                let pair = RegPair::from_rp(p, mode);
                let op = if q == 0 { Op::Inc16(pair) } else { Op::Dec16(pair) };
                (op, m1.internal(2))
            }
            4 | 5 => {
                let (target, shape) = if y == 6 {
                    let (target, shape) = memory_operand(mode, &mut cur, m1);
                    (target, shape.read().internal(1).write())
                } else {
                    (reg_operand(y, mode), m1)
                };
                let op = if z == 4 { Op::Inc8(target) } else { Op::Dec8(target) };
                (op, shape)
            }
            6 => {
                if y == 6 {
                    let (dst, shape) = match mode {
                        IndexMode::HL => (Operand8::Indirect(RegPair::HL), m1.read().write()),
                        _ => {
                            let disp = cur.next_byte() as i8;
                            (Operand8::Indexed(mode, disp), m1.reads(2).internal(2).write())
                        }
                    };
                    let value = cur.next_byte();
                    (Op::Ld8 { dst, src: Operand8::Imm(value) }, shape)
                } else {
                    let value = cur.next_byte();
                    (Op::Ld8 { dst: reg_operand(y, mode), src: Operand8::Imm(value) }, m1.read())
                }
            }
            _ => {
                let op = match y {
                    0 => Op::Rlca,
                    1 => Op::Rrca,
                    2 => Op::Rla,
                    3 => Op::Rra,
                    4 => Op::Daa,
                    5 => Op::Cpl,
                    6 => Op::Scf,
                    _ => Op::Ccf,
                };
                (op, m1)
            }
        },
        1 => {
            if y == 6 && z == 6 {
                (Op::Halt, m1)
            } else if z == 6 {
                // LD r,(HL): r is never an index half.
                let (src, shape) = memory_operand(mode, &mut cur, m1);
                (Op::Ld8 { dst: reg_operand(y, IndexMode::HL), src }, shape.read())
            } else if y == 6 {
                let (dst, shape) = memory_operand(mode, &mut cur, m1);
                (Op::Ld8 { dst, src: reg_operand(z, IndexMode::HL) }, shape.write())
            } else {
                (Op::Ld8 { dst: reg_operand(y, mode), src: reg_operand(z, mode) }, m1)
            }
        }
        2 => {
            let alu = AluOp::from_index(y);
            if z == 6 {
                let (src, shape) = memory_operand(mode, &mut cur, m1);
                (Op::Alu { op: alu, src }, shape.read())
            } else {
                (Op::Alu { op: alu, src: reg_operand(z, mode) }, m1)
            }
        }
        _ => match z {
            0 => (Op::Ret(Some(Condition::from_index(y))), m1.internal(1)),
            1 => match (q, p) {
                (0, _) => (Op::Pop(RegPair::from_rp_af(p, mode)), m1.reads(2)),
                (_, 0) => (Op::Ret(None), m1.reads(2)),
                (_, 1) => (Op::Exx, m1),
                (_, 2) => (Op::JpInd(hl), m1),
                (_, _) => (Op::LdSp(hl), m1.internal(2)),
            },
            2 => {
                let addr = cur.next_word();
                (Op::Jp { cond: Some(Condition::from_index(y)), addr }, m1.reads(2))
            }
            3 => match y {
                0 => {
                    let addr = cur.next_word();
                    (Op::Jp { cond: None, addr }, m1.reads(2))
                }
                // CB is routed before reaching here except after DD/FD,
                // which goes through decode_index_cb.
                1 => (Op::Unimplemented { prefix: None, opcode }, m1),
                2 => {
                    let port = cur.next_byte();
                    (Op::OutA(port), m1.read().io_out())
                }
                3 => {
                    let port = cur.next_byte();
                    (Op::InA(port), m1.read().io_in())
                }
                4 => (Op::ExSp(hl), m1.reads(2).internal(1).writes(2).internal(2)),
                // EX DE,HL ignores the index prefix.
                5 => (Op::ExDeHl, m1),
                6 => (Op::Di, m1),
                _ => (Op::Ei, m1),
            },
            4 => {
                let addr = cur.next_word();
                (Op::Call { cond: Some(Condition::from_index(y)), addr }, m1.reads(2))
            }
            5 => match (q, p) {
                (0, _) => (Op::Push(RegPair::from_rp_af(p, mode)), m1.internal(1).writes(2)),
                (_, 0) => {
                    let addr = cur.next_word();
                    (Op::Call { cond: None, addr }, m1.reads(2).internal(1).writes(2))
                }
                // DD, ED and FD are routed by `decode` before reaching here.
                (_, _) => (Op::Unimplemented { prefix: None, opcode }, m1),
            },
            6 => {
                let value = cur.next_byte();
                (Op::Alu { op: AluOp::from_index(y), src: Operand8::Imm(value) }, m1.read())
            }
            _ => (Op::Rst(y * 8), m1.internal(1).writes(2)),
        },
    };
    cur.finish(op, shape)
}

fn decode_cb(opcode: u8) -> (Op, CycleShape) {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 0x07;
    let z = opcode & 0x07;
    let m1 = CycleShape::M1.fetch();

    let (target, memory) = if z == 6 {
        (Operand8::Indirect(RegPair::HL), true)
    } else {
        (reg_operand(z, IndexMode::HL), false)
    };
    let rmw = if memory { m1.read().internal(1).write() } else { m1 };

    match x {
        0 => (Op::Shift { op: ShiftOp::from_index(y), target, copy: None }, rmw),
        1 => {
            let shape = if memory { m1.read().internal(1) } else { m1 };
            (Op::Bit { bit: y, target }, shape)
        }
        2 => (Op::Res { bit: y, target, copy: None }, rmw),
        _ => (Op::Set { bit: y, target, copy: None }, rmw),
    }
}

/// DD CB d op / FD CB d op. The displacement precedes the opcode.
fn decode_index_cb<M: Memory + ?Sized>(mode: IndexMode, mut cur: Cursor<'_, M>) -> Instruction {
    let disp = cur.next_byte() as i8;
    let opcode = cur.next_byte();
    let x = opcode >> 6;
    let y = (opcode >> 3) & 0x07;
    let z = opcode & 0x07;

    let target = Operand8::Indexed(mode, disp);
    let copy = if z == 6 { None } else { Reg8::from_index(z, IndexMode::HL) };
    let base = CycleShape::M1.fetch().reads(2).internal(2);
    let rmw = base.read().internal(1).write();

    let (op, shape) = match x {
        0 => (Op::Shift { op: ShiftOp::from_index(y), target, copy }, rmw),
        1 => (Op::Bit { bit: y, target }, base.read().internal(1)),
        2 => (Op::Res { bit: y, target, copy }, rmw),
        _ => (Op::Set { bit: y, target, copy }, rmw),
    };
    cur.finish(op, shape)
}

fn decode_ed<M: Memory + ?Sized>(opcode: u8, mut cur: Cursor<'_, M>) -> Instruction {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 0x07;
    let z = opcode & 0x07;
    let p = y >> 1;
    let q = y & 0x01;
    let m1 = CycleShape::M1.fetch();
    let unimplemented = Op::Unimplemented { prefix: Some(0xED), opcode };

    let (op, shape) = match x {
        1 => match z {
            0 => {
                let reg = if y == 6 { None } else { Reg8::from_index(y, IndexMode::HL) };
                (Op::InC(reg), m1.io_in())
            }
            1 => {
                let reg = if y == 6 { None } else { Reg8::from_index(y, IndexMode::HL) };
                (Op::OutC(reg), m1.io_out())
            }
            2 => {
                let pair = RegPair::from_rp(p, IndexMode::HL);
                let op = if q == 0 { Op::Sbc16(pair) } else { Op::Adc16(pair) };
                (op, m1.internal(7))
            }
            3 => {
                let pair = RegPair::from_rp(p, IndexMode::HL);
                let addr = cur.next_word();
                if q == 0 {
                    (Op::Ld16Store { addr, src: pair }, m1.reads(2).writes(2))
                } else {
                    (Op::Ld16Load { dst: pair, addr }, m1.reads(4))
                }
            }
            4 => (Op::Neg, m1),
            5 => {
                let op = if y == 1 { Op::Reti } else { Op::Retn };
                (op, m1.reads(2))
            }
            6 => {
                let mode = match y & 0x03 {
                    2 => 1,
                    3 => 2,
                    _ => 0,
                };
                (Op::Im(mode), m1)
            }
            _ => match y {
                0 => (Op::LdIA, m1.internal(1)),
                1 => (Op::LdRA, m1.internal(1)),
                2 => (Op::LdAI, m1.internal(1)),
                3 => (Op::LdAR, m1.internal(1)),
                4 => (Op::Rrd, m1.read().internal(4).write()),
                5 => (Op::Rld, m1.read().internal(4).write()),
                _ => (unimplemented, m1),
            },
        },
        2 if z <= 3 && y >= 4 => {
            let dir = if y & 0x01 == 0 { Direction::Increment } else { Direction::Decrement };
            let repeat = y >= 6;
            let (block, shape) = match z {
                0 => (BlockOp::Ld, m1.read().write().internal(2)),
                1 => (BlockOp::Cp, m1.read().internal(5)),
                2 => (BlockOp::In, m1.internal(1).io_in().write()),
                _ => (BlockOp::Out, m1.internal(1).read().io_out()),
            };
            (Op::Block { op: block, dir, repeat }, shape)
        }
        _ => (unimplemented, m1),
    };
    cur.finish(op, shape)
}
