use std::collections::VecDeque;

use quartz_core::core::{IoPorts, Memory};
use quartz_core::cpu::z80::Registers;
use serde::{Deserialize, Serialize};

// --- Tracing collaborators: flat 64KB memory and a port space, each
// recording every access in order ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusOp {
    Read,
    Write,
    PortRead,
    PortWrite,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

pub struct TracingMemory {
    pub memory: Box<[u8; 0x10000]>,
    pub cycles: Vec<BusCycle>,
}

impl TracingMemory {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            cycles: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.memory[usize::from(addr.wrapping_add(i as u16))] = byte;
        }
    }

    pub fn count(&self, op: BusOp) -> usize {
        self.cycles.iter().filter(|c| c.op == op).count()
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }
}

impl Default for TracingMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for TracingMemory {
    fn read_byte(&mut self, addr: u16) -> u8 {
        let data = self.memory[usize::from(addr)];
        self.cycles.push(BusCycle { addr, data, op: BusOp::Read });
        data
    }

    fn write_byte(&mut self, addr: u16, data: u8) {
        self.memory[usize::from(addr)] = data;
        self.cycles.push(BusCycle { addr, data, op: BusOp::Write });
    }
}

/// Port space that answers reads from a queue (0xFF once it runs dry).
#[derive(Default)]
pub struct TracingPorts {
    pub inputs: VecDeque<u8>,
    pub cycles: Vec<BusCycle>,
}

impl TracingPorts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, op: BusOp) -> usize {
        self.cycles.iter().filter(|c| c.op == op).count()
    }

    pub fn writes(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.cycles
            .iter()
            .filter(|c| c.op == BusOp::PortWrite)
            .map(|c| (c.addr as u8, c.data))
    }
}

impl IoPorts for TracingPorts {
    fn read_port(&mut self, port: u8) -> u8 {
        let data = self.inputs.pop_front().unwrap_or(0xFF);
        self.cycles.push(BusCycle { addr: u16::from(port), data, op: BusOp::PortRead });
        data
    }

    fn write_port(&mut self, port: u8, data: u8) {
        self.cycles.push(BusCycle { addr: u16::from(port), data, op: BusOp::PortWrite });
    }
}

// --- Z80 JSON test vector types (SingleStepTests/z80 format) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80TestCase {
    pub name: String,
    pub initial: Z80CpuState,
    #[serde(rename = "final")]
    pub final_state: Z80CpuState,
    /// One entry per T-state: address, data (if driven), pin summary.
    pub cycles: Vec<(Option<u16>, Option<u8>, String)>,
    #[serde(default)]
    pub ports: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Z80CpuState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
    pub h: u8,
    pub l: u8,
    pub i: u8,
    pub r: u8,
    #[serde(default)]
    pub ei: u8,
    #[serde(default)]
    pub wz: u16,
    pub ix: u16,
    pub iy: u16,
    #[serde(rename = "af_")]
    pub af_prime: u16,
    #[serde(rename = "bc_")]
    pub bc_prime: u16,
    #[serde(rename = "de_")]
    pub de_prime: u16,
    #[serde(rename = "hl_")]
    pub hl_prime: u16,
    pub im: u8,
    #[serde(default)]
    pub p: u8,
    #[serde(default)]
    pub q: u8,
    pub iff1: u8,
    pub iff2: u8,
    pub ram: Vec<(u16, u8)>,
}

impl Z80CpuState {
    /// Register file for this state. WZ, P and Q have no counterpart in
    /// the core and are dropped.
    pub fn to_registers(&self) -> Registers {
        let mut regs = Registers::new();
        regs.a = self.a;
        regs.f = self.f;
        regs.b = self.b;
        regs.c = self.c;
        regs.d = self.d;
        regs.e = self.e;
        regs.h = self.h;
        regs.l = self.l;
        regs.i = self.i;
        regs.r = self.r;
        regs.ix = self.ix;
        regs.iy = self.iy;
        regs.sp = self.sp;
        regs.pc = self.pc;
        regs.iff1 = self.iff1 != 0;
        regs.iff2 = self.iff2 != 0;
        regs.im = self.im;
        regs.set_af_prime(self.af_prime);
        regs.set_bc_prime(self.bc_prime);
        regs.set_de_prime(self.de_prime);
        regs.set_hl_prime(self.hl_prime);
        regs
    }

    /// The inverse of [`to_registers`](Self::to_registers), without RAM.
    pub fn from_registers(regs: &Registers) -> Self {
        Self {
            pc: regs.pc,
            sp: regs.sp,
            a: regs.a,
            b: regs.b,
            c: regs.c,
            d: regs.d,
            e: regs.e,
            f: regs.f,
            h: regs.h,
            l: regs.l,
            i: regs.i,
            r: regs.r,
            ix: regs.ix,
            iy: regs.iy,
            af_prime: regs.get_af_prime(),
            bc_prime: regs.get_bc_prime(),
            de_prime: regs.get_de_prime(),
            hl_prime: regs.get_hl_prime(),
            im: regs.im,
            iff1: u8::from(regs.iff1),
            iff2: u8::from(regs.iff2),
            ..Self::default()
        }
    }
}

/// Every opcode sequence whose declared cycle shape can be checked against
/// the bus: unprefixed, CB, ED, and DD/FD with and without CB. Stacked
/// prefixes are left out because the dropped prefix is a bare fetch.
pub fn opcode_prefixes() -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for op in 0..=0xFFu8 {
        if !matches!(op, 0xCB | 0xDD | 0xED | 0xFD) {
            out.push(vec![op]);
        }
        out.push(vec![0xCB, op]);
        out.push(vec![0xED, op]);
        for prefix in [0xDD, 0xFD] {
            if !matches!(op, 0xCB | 0xDD | 0xED | 0xFD) {
                out.push(vec![prefix, op]);
            }
            // The displacement sits between CB and the opcode.
            out.push(vec![prefix, 0xCB, 0x00, op]);
        }
    }
    out
}
