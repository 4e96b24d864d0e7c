//! Decoded instructions.
//!
//! The decoder turns opcode bytes into an [`Instruction`]: a closed set of
//! [`Op`] variants plus the instruction's size and declared cycle shape.
//! Execution lives in the per-family modules (alu, bit, block, branch,
//! control, io, load_store, stack), all of which extend [`Exec`].

use std::fmt;

use crate::core::{IoPorts, Memory};
use crate::cpu::z80::cycles::CycleShape;
use crate::cpu::z80::registers::{IndexMode, Reg8, RegPair, Registers};

/// Extra T-states for a taken JR cc / DJNZ, and for each repeat of a block
/// instruction.
pub(crate) const BRANCH_TAKEN_T: u32 = 5;
pub(crate) const BLOCK_REPEAT_T: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    pub(crate) const fn from_index(index: u8) -> Self {
        match index & 0x07 {
            0 => Self::Add,
            1 => Self::Adc,
            2 => Self::Sub,
            3 => Self::Sbc,
            4 => Self::And,
            5 => Self::Xor,
            6 => Self::Or,
            _ => Self::Cp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Sll,
    Srl,
}

impl ShiftOp {
    pub(crate) const fn from_index(index: u8) -> Self {
        match index & 0x07 {
            0 => Self::Rlc,
            1 => Self::Rrc,
            2 => Self::Rl,
            3 => Self::Rr,
            4 => Self::Sla,
            5 => Self::Sra,
            6 => Self::Sll,
            _ => Self::Srl,
        }
    }
}

/// Branch conditions, in opcode field order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    NZ,
    Z,
    NC,
    C,
    PO,
    PE,
    P,
    M,
}

impl Condition {
    pub(crate) const fn from_index(index: u8) -> Self {
        match index & 0x07 {
            0 => Self::NZ,
            1 => Self::Z,
            2 => Self::NC,
            3 => Self::C,
            4 => Self::PO,
            5 => Self::PE,
            6 => Self::P,
            _ => Self::M,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOp {
    Ld,
    Cp,
    In,
    Out,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    pub(crate) const fn delta(self) -> u16 {
        match self {
            Self::Increment => 1,
            Self::Decrement => 0xFFFF,
        }
    }
}

/// An 8-bit operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand8 {
    Reg(Reg8),
    Imm(u8),
    /// (BC), (DE) or (HL)
    Indirect(RegPair),
    /// (IX+d) or (IY+d)
    Indexed(IndexMode, i8),
    /// (nn)
    Absolute(u16),
}

/// Every instruction the decoder can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Nop,
    Halt,
    Di,
    Ei,
    Im(u8),

    // 8/16-bit loads and exchanges
    Ld8 { dst: Operand8, src: Operand8 },
    Ld16 { dst: RegPair, value: u16 },
    Ld16Load { dst: RegPair, addr: u16 },
    Ld16Store { addr: u16, src: RegPair },
    LdSp(RegPair),
    LdAI,
    LdAR,
    LdIA,
    LdRA,
    ExAf,
    ExDeHl,
    Exx,
    ExSp(RegPair),

    // Arithmetic and logic
    Alu { op: AluOp, src: Operand8 },
    Inc8(Operand8),
    Dec8(Operand8),
    Inc16(RegPair),
    Dec16(RegPair),
    Add16 { dst: RegPair, src: RegPair },
    Adc16(RegPair),
    Sbc16(RegPair),
    Rlca,
    Rrca,
    Rla,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Neg,
    Rld,
    Rrd,

    // CB family. `copy` is the undocumented DD/FD CB register write-back.
    Shift { op: ShiftOp, target: Operand8, copy: Option<Reg8> },
    Bit { bit: u8, target: Operand8 },
    Res { bit: u8, target: Operand8, copy: Option<Reg8> },
    Set { bit: u8, target: Operand8, copy: Option<Reg8> },

    // Control flow
    Jp { cond: Option<Condition>, addr: u16 },
    JpInd(RegPair),
    Jr { cond: Option<Condition>, offset: i8 },
    Djnz(i8),
    Call { cond: Option<Condition>, addr: u16 },
    Ret(Option<Condition>),
    Retn,
    Reti,
    Rst(u8),

    // Stack
    Push(RegPair),
    Pop(RegPair),

    // I/O. `None` register is the flags-only IN (C) / OUT (C),0 form.
    InA(u8),
    OutA(u8),
    InC(Option<Reg8>),
    OutC(Option<Reg8>),

    Block { op: BlockOp, dir: Direction, repeat: bool },

    /// Decoded but not supported. Behaves as a no-op and logs.
    Unimplemented { prefix: Option<u8>, opcode: u8 },
}

/// CPU state an instruction may touch besides registers and the buses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuSignals {
    pub halted: bool,
    /// Set by EI: interrupts stay blocked until one more instruction ran.
    pub ei_delay: bool,
}

/// A decoded instruction. Created per fetch, consumed by execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    /// Address of the first byte (including any prefix).
    pub address: u16,
    /// Length in bytes including prefixes and operands.
    pub size: u16,
    /// Bus cycles of the single-pass / not-taken path.
    pub cycles: CycleShape,
    /// Raw bytes, `size` of them are meaningful.
    pub bytes: [u8; 4],
}

/// Everything one instruction execution may borrow.
pub(crate) struct Exec<'a, M: Memory + ?Sized, I: IoPorts + ?Sized> {
    pub(crate) regs: &'a mut Registers,
    pub(crate) mem: &'a mut M,
    pub(crate) io: &'a mut I,
    pub(crate) signals: &'a mut CpuSignals,
}

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    /// Effective address for a memory operand.
    pub(crate) fn operand_addr(&self, operand: Operand8) -> Option<u16> {
        match operand {
            Operand8::Indirect(pair) => Some(self.regs.get_pair(pair)),
            Operand8::Indexed(mode, disp) => {
                let base = self.regs.get_pair(mode.pair());
                Some(base.wrapping_add(disp as i16 as u16))
            }
            Operand8::Absolute(addr) => Some(addr),
            Operand8::Reg(_) | Operand8::Imm(_) => None,
        }
    }

    pub(crate) fn read8(&mut self, operand: Operand8) -> u8 {
        match operand {
            Operand8::Reg(reg) => self.regs.get_reg8(reg),
            Operand8::Imm(value) => value,
            _ => {
                let addr = self.operand_addr(operand).unwrap_or_default();
                self.mem.read_byte(addr)
            }
        }
    }

    pub(crate) fn write8(&mut self, operand: Operand8, value: u8) {
        match operand {
            Operand8::Reg(reg) => self.regs.set_reg8(reg, value),
            Operand8::Imm(_) => {
                log::warn!(target: "cpu", "write to immediate operand dropped");
            }
            _ => {
                let addr = self.operand_addr(operand).unwrap_or_default();
                self.mem.write_byte(addr, value);
            }
        }
    }

    pub(crate) fn dispatch(&mut self, instr: &Instruction) -> u32 {
        let base = instr.cycles.t_states();
        let extra = match instr.op {
            Op::Nop => 0,
            Op::Halt | Op::Di | Op::Ei | Op::Im(_) => self.op_control(instr.op),
            Op::Unimplemented { prefix, opcode } => {
                log::warn!(
                    target: "cpu",
                    "unimplemented opcode {}{:02X} at {:04X}, treated as NOP",
                    prefix.map(|p| format!("{p:02X} ")).unwrap_or_default(),
                    opcode,
                    instr.address
                );
                0
            }

            Op::Ld8 { dst, src } => self.op_ld8(dst, src),
            Op::Ld16 { dst, value } => self.op_ld16(dst, value),
            Op::Ld16Load { dst, addr } => self.op_ld16_load(dst, addr),
            Op::Ld16Store { addr, src } => self.op_ld16_store(addr, src),
            Op::LdSp(src) => self.op_ld_sp(src),
            Op::LdAI | Op::LdAR | Op::LdIA | Op::LdRA => self.op_ld_special(instr.op),
            Op::ExAf | Op::ExDeHl | Op::Exx => self.op_exchange(instr.op),
            Op::ExSp(pair) => self.op_ex_sp(pair),

            Op::Alu { op, src } => self.op_alu(op, src),
            Op::Inc8(target) => self.op_inc_dec8(target, false),
            Op::Dec8(target) => self.op_inc_dec8(target, true),
            Op::Inc16(pair) => self.op_inc_dec16(pair, false),
            Op::Dec16(pair) => self.op_inc_dec16(pair, true),
            Op::Add16 { dst, src } => self.op_add16(dst, src),
            Op::Adc16(src) => self.op_adc_hl(src),
            Op::Sbc16(src) => self.op_sbc_hl(src),
            Op::Rlca | Op::Rrca | Op::Rla | Op::Rra => self.op_rotate_a(instr.op),
            Op::Daa => self.op_daa(),
            Op::Cpl => self.op_cpl(),
            Op::Scf => self.op_scf(),
            Op::Ccf => self.op_ccf(),
            Op::Neg => self.op_neg(),
            Op::Rld => self.op_rld(),
            Op::Rrd => self.op_rrd(),

            Op::Shift { op, target, copy } => self.op_shift(op, target, copy),
            Op::Bit { bit, target } => self.op_bit(bit, target),
            Op::Res { bit, target, copy } => self.op_res_set(bit, target, copy, false),
            Op::Set { bit, target, copy } => self.op_res_set(bit, target, copy, true),

            Op::Jp { cond, addr } => self.op_jp(cond, addr),
            Op::JpInd(pair) => self.op_jp_ind(pair),
            Op::Jr { cond, offset } => self.op_jr(cond, offset),
            Op::Djnz(offset) => self.op_djnz(offset),
            Op::Call { cond, addr } => self.op_call(cond, addr),
            Op::Ret(cond) => self.op_ret(cond),
            Op::Retn | Op::Reti => self.op_retn(),
            Op::Rst(vector) => self.op_rst(vector),

            Op::Push(pair) => self.op_push(pair),
            Op::Pop(pair) => self.op_pop(pair),

            Op::InA(port) => self.op_in_a_n(port),
            Op::OutA(port) => self.op_out_n_a(port),
            Op::InC(reg) => self.op_in_r_c(reg),
            Op::OutC(reg) => self.op_out_c_r(reg),

            Op::Block { op, dir, repeat } => self.op_block(op, dir, repeat, instr.address),
        };
        base + extra
    }
}

impl Instruction {
    /// Base T-states (single pass, branch not taken).
    #[must_use]
    pub const fn base_cycles(&self) -> u32 {
        self.cycles.t_states()
    }

    /// The meaningful raw bytes.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.bytes[..usize::from(self.size).min(self.bytes.len())]
    }

    /// Run the instruction. PC is first set past the instruction, then
    /// branches, calls, returns and repeating block instructions overwrite
    /// it. Returns the T-states actually consumed, which exceeds
    /// [`base_cycles`](Self::base_cycles) for taken branches and block
    /// repeats.
    pub fn execute<M: Memory + ?Sized, I: IoPorts + ?Sized>(
        &self,
        signals: &mut CpuSignals,
        regs: &mut Registers,
        mem: &mut M,
        io: &mut I,
    ) -> u32 {
        regs.pc = self.address.wrapping_add(self.size);
        let mut exec = Exec { regs, mem, io, signals };
        exec.dispatch(self)
    }

    /// True if running this instruction repeatedly with unchanged registers
    /// cannot change anything outside the register file, so an idle loop
    /// made of such instructions may be skipped.
    #[must_use]
    pub fn is_idle_safe(&self) -> bool {
        if self.cycles.writes_externally() {
            return false;
        }
        !matches!(
            self.op,
            Op::Halt
                | Op::Call { .. }
                | Op::Rst(_)
                | Op::Di
                | Op::Ei
                | Op::Im(_)
                | Op::Retn
                | Op::Reti
                | Op::LdIA
                | Op::LdRA
                | Op::LdAR
                | Op::Unimplemented { .. }
        )
    }
}

// --- Disassembly ---

impl fmt::Display for Reg8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg8::A => "A",
            Reg8::B => "B",
            Reg8::C => "C",
            Reg8::D => "D",
            Reg8::E => "E",
            Reg8::H => "H",
            Reg8::L => "L",
            Reg8::IXH => "IXH",
            Reg8::IXL => "IXL",
            Reg8::IYH => "IYH",
            Reg8::IYL => "IYL",
        };
        f.write_str(name)
    }
}

impl fmt::Display for RegPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegPair::AF => "AF",
            RegPair::BC => "BC",
            RegPair::DE => "DE",
            RegPair::HL => "HL",
            RegPair::SP => "SP",
            RegPair::IX => "IX",
            RegPair::IY => "IY",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Operand8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand8::Reg(reg) => write!(f, "{reg}"),
            Operand8::Imm(value) => write!(f, "${value:02X}"),
            Operand8::Indirect(pair) => write!(f, "({pair})"),
            Operand8::Indexed(mode, disp) => {
                let sign = if *disp < 0 { '-' } else { '+' };
                write!(f, "({}{sign}${:02X})", mode.pair(), disp.unsigned_abs())
            }
            Operand8::Absolute(addr) => write!(f, "(${addr:04X})"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn alu_mnemonic(op: AluOp) -> &'static str {
    match op {
        AluOp::Add => "ADD A,",
        AluOp::Adc => "ADC A,",
        AluOp::Sub => "SUB ",
        AluOp::Sbc => "SBC A,",
        AluOp::And => "AND ",
        AluOp::Xor => "XOR ",
        AluOp::Or => "OR ",
        AluOp::Cp => "CP ",
    }
}

fn block_mnemonic(op: BlockOp, dir: Direction, repeat: bool) -> String {
    let stem = match op {
        BlockOp::Ld => "LD",
        BlockOp::Cp => "CP",
        BlockOp::In => "IN",
        BlockOp::Out if repeat => "OT",
        BlockOp::Out => "OUT",
    };
    let d = match dir {
        Direction::Increment => 'I',
        Direction::Decrement => 'D',
    };
    if repeat {
        format!("{stem}{d}R")
    } else {
        format!("{stem}{d}")
    }
}

fn with_cond(f: &mut fmt::Formatter<'_>, name: &str, cond: Option<Condition>) -> fmt::Result {
    match cond {
        Some(cc) => write!(f, "{name} {cc},"),
        None => write!(f, "{name} "),
    }
}

fn copy_suffix(copy: Option<Reg8>) -> String {
    copy.map(|r| format!(",{r}")).unwrap_or_default()
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Op::Nop => f.write_str("NOP"),
            Op::Halt => f.write_str("HALT"),
            Op::Di => f.write_str("DI"),
            Op::Ei => f.write_str("EI"),
            Op::Im(mode) => write!(f, "IM {mode}"),
            Op::Ld8 { dst, src } => write!(f, "LD {dst},{src}"),
            Op::Ld16 { dst, value } => write!(f, "LD {dst},${value:04X}"),
            Op::Ld16Load { dst, addr } => write!(f, "LD {dst},(${addr:04X})"),
            Op::Ld16Store { addr, src } => write!(f, "LD (${addr:04X}),{src}"),
            Op::LdSp(src) => write!(f, "LD SP,{src}"),
            Op::LdAI => f.write_str("LD A,I"),
            Op::LdAR => f.write_str("LD A,R"),
            Op::LdIA => f.write_str("LD I,A"),
            Op::LdRA => f.write_str("LD R,A"),
            Op::ExAf => f.write_str("EX AF,AF'"),
            Op::ExDeHl => f.write_str("EX DE,HL"),
            Op::Exx => f.write_str("EXX"),
            Op::ExSp(pair) => write!(f, "EX (SP),{pair}"),
            Op::Alu { op, src } => write!(f, "{}{src}", alu_mnemonic(op)),
            Op::Inc8(target) => write!(f, "INC {target}"),
            Op::Dec8(target) => write!(f, "DEC {target}"),
            Op::Inc16(pair) => write!(f, "INC {pair}"),
            Op::Dec16(pair) => write!(f, "DEC {pair}"),
            Op::Add16 { dst, src } => write!(f, "ADD {dst},{src}"),
            Op::Adc16(src) => write!(f, "ADC HL,{src}"),
            Op::Sbc16(src) => write!(f, "SBC HL,{src}"),
            Op::Rlca => f.write_str("RLCA"),
            Op::Rrca => f.write_str("RRCA"),
            Op::Rla => f.write_str("RLA"),
            Op::Rra => f.write_str("RRA"),
            Op::Daa => f.write_str("DAA"),
            Op::Cpl => f.write_str("CPL"),
            Op::Scf => f.write_str("SCF"),
            Op::Ccf => f.write_str("CCF"),
            Op::Neg => f.write_str("NEG"),
            Op::Rld => f.write_str("RLD"),
            Op::Rrd => f.write_str("RRD"),
            Op::Shift { op, target, copy } => {
                let name = format!("{op:?}").to_uppercase();
                write!(f, "{name} {target}{}", copy_suffix(copy))
            }
            Op::Bit { bit, target } => write!(f, "BIT {bit},{target}"),
            Op::Res { bit, target, copy } => write!(f, "RES {bit},{target}{}", copy_suffix(copy)),
            Op::Set { bit, target, copy } => write!(f, "SET {bit},{target}{}", copy_suffix(copy)),
            Op::Jp { cond, addr } => {
                with_cond(f, "JP", cond)?;
                write!(f, "${addr:04X}")
            }
            Op::JpInd(pair) => write!(f, "JP ({pair})"),
            Op::Jr { cond, offset } => {
                with_cond(f, "JR", cond)?;
                write!(f, "{offset:+}")
            }
            Op::Djnz(offset) => write!(f, "DJNZ {offset:+}"),
            Op::Call { cond, addr } => {
                with_cond(f, "CALL", cond)?;
                write!(f, "${addr:04X}")
            }
            Op::Ret(Some(cc)) => write!(f, "RET {cc}"),
            Op::Ret(None) => f.write_str("RET"),
            Op::Retn => f.write_str("RETN"),
            Op::Reti => f.write_str("RETI"),
            Op::Rst(vector) => write!(f, "RST ${vector:02X}"),
            Op::Push(pair) => write!(f, "PUSH {pair}"),
            Op::Pop(pair) => write!(f, "POP {pair}"),
            Op::InA(port) => write!(f, "IN A,(${port:02X})"),
            Op::OutA(port) => write!(f, "OUT (${port:02X}),A"),
            Op::InC(Some(reg)) => write!(f, "IN {reg},(C)"),
            Op::InC(None) => f.write_str("IN (C)"),
            Op::OutC(Some(reg)) => write!(f, "OUT (C),{reg}"),
            Op::OutC(None) => f.write_str("OUT (C),0"),
            Op::Block { op, dir, repeat } => f.write_str(&block_mnemonic(op, dir, repeat)),
            Op::Unimplemented { prefix: Some(p), opcode } => write!(f, "?? {p:02X} {opcode:02X}"),
            Op::Unimplemented { prefix: None, opcode } => write!(f, "?? {opcode:02X}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.op, f)
    }
}
