//! Z80 register file.

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// 8-bit register operands, including the undocumented index halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    IXH,
    IXL,
    IYH,
    IYL,
}

/// 16-bit register pairs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegPair {
    AF,
    BC,
    DE,
    HL,
    SP,
    IX,
    IY,
}

/// Which register a DD/FD prefix substitutes for HL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IndexMode {
    #[default]
    HL,
    IX,
    IY,
}

impl IndexMode {
    /// The register pair that stands in for HL.
    #[must_use]
    pub const fn pair(self) -> RegPair {
        match self {
            Self::HL => RegPair::HL,
            Self::IX => RegPair::IX,
            Self::IY => RegPair::IY,
        }
    }

    /// The opcode prefix that selects this mode, if any.
    #[must_use]
    pub const fn prefix(self) -> Option<u8> {
        match self {
            Self::HL => None,
            Self::IX => Some(0xDD),
            Self::IY => Some(0xFD),
        }
    }
}

impl Reg8 {
    /// Decode the 3-bit register field (0=B .. 7=A). Index 6 is the memory
    /// operand and has no register; callers handle it before asking.
    /// Under an index prefix H and L become the halves of IX/IY.
    #[must_use]
    pub fn from_index(index: u8, mode: IndexMode) -> Option<Self> {
        Some(match (index, mode) {
            (0, _) => Self::B,
            (1, _) => Self::C,
            (2, _) => Self::D,
            (3, _) => Self::E,
            (4, IndexMode::HL) => Self::H,
            (5, IndexMode::HL) => Self::L,
            (4, IndexMode::IX) => Self::IXH,
            (5, IndexMode::IX) => Self::IXL,
            (4, IndexMode::IY) => Self::IYH,
            (5, IndexMode::IY) => Self::IYL,
            (7, _) => Self::A,
            _ => return None,
        })
    }
}

impl RegPair {
    /// Pair field for loads and arithmetic (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    #[must_use]
    pub const fn from_rp(index: u8, mode: IndexMode) -> Self {
        match index & 0x03 {
            0 => Self::BC,
            1 => Self::DE,
            2 => mode.pair(),
            _ => Self::SP,
        }
    }

    /// Pair field for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    #[must_use]
    pub const fn from_rp_af(index: u8, mode: IndexMode) -> Self {
        match index & 0x03 {
            0 => Self::BC,
            1 => Self::DE,
            2 => mode.pair(),
            _ => Self::AF,
        }
    }
}

/// The complete programmer-visible register set plus interrupt bookkeeping.
///
/// Only the CPU owns one; instructions get it by `&mut` for the duration of
/// a single execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
    // Interrupt flip-flops and mode
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
}

impl Registers {
    #[must_use]
    pub fn new() -> Self {
        let mut regs = Self::default();
        regs.reset();
        regs
    }

    /// Power-on state: everything zero except SP.
    pub fn reset(&mut self) {
        *self = Self {
            sp: 0xFFFF,
            ..Self::default()
        };
    }

    // Helpers for 16-bit register access
    pub fn get_af(&self) -> u16 { u16::from_be_bytes([self.a, self.f]) }
    pub fn set_af(&mut self, val: u16) { [self.a, self.f] = val.to_be_bytes(); }

    pub fn get_bc(&self) -> u16 { u16::from_be_bytes([self.b, self.c]) }
    pub fn set_bc(&mut self, val: u16) { [self.b, self.c] = val.to_be_bytes(); }

    pub fn get_de(&self) -> u16 { u16::from_be_bytes([self.d, self.e]) }
    pub fn set_de(&mut self, val: u16) { [self.d, self.e] = val.to_be_bytes(); }

    pub fn get_hl(&self) -> u16 { u16::from_be_bytes([self.h, self.l]) }
    pub fn set_hl(&mut self, val: u16) { [self.h, self.l] = val.to_be_bytes(); }

    pub fn get_af_prime(&self) -> u16 { u16::from_be_bytes([self.a_prime, self.f_prime]) }
    pub fn set_af_prime(&mut self, val: u16) { [self.a_prime, self.f_prime] = val.to_be_bytes(); }

    pub fn get_bc_prime(&self) -> u16 { u16::from_be_bytes([self.b_prime, self.c_prime]) }
    pub fn set_bc_prime(&mut self, val: u16) { [self.b_prime, self.c_prime] = val.to_be_bytes(); }

    pub fn get_de_prime(&self) -> u16 { u16::from_be_bytes([self.d_prime, self.e_prime]) }
    pub fn set_de_prime(&mut self, val: u16) { [self.d_prime, self.e_prime] = val.to_be_bytes(); }

    pub fn get_hl_prime(&self) -> u16 { u16::from_be_bytes([self.h_prime, self.l_prime]) }
    pub fn set_hl_prime(&mut self, val: u16) { [self.h_prime, self.l_prime] = val.to_be_bytes(); }

    pub fn get_reg8(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::A => self.a,
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
            Reg8::IXH => (self.ix >> 8) as u8,
            Reg8::IXL => self.ix as u8,
            Reg8::IYH => (self.iy >> 8) as u8,
            Reg8::IYL => self.iy as u8,
        }
    }

    pub fn set_reg8(&mut self, reg: Reg8, val: u8) {
        match reg {
            Reg8::A => self.a = val,
            Reg8::B => self.b = val,
            Reg8::C => self.c = val,
            Reg8::D => self.d = val,
            Reg8::E => self.e = val,
            Reg8::H => self.h = val,
            Reg8::L => self.l = val,
            Reg8::IXH => self.ix = (self.ix & 0x00FF) | ((val as u16) << 8),
            Reg8::IXL => self.ix = (self.ix & 0xFF00) | val as u16,
            Reg8::IYH => self.iy = (self.iy & 0x00FF) | ((val as u16) << 8),
            Reg8::IYL => self.iy = (self.iy & 0xFF00) | val as u16,
        }
    }

    pub fn get_pair(&self, pair: RegPair) -> u16 {
        match pair {
            RegPair::AF => self.get_af(),
            RegPair::BC => self.get_bc(),
            RegPair::DE => self.get_de(),
            RegPair::HL => self.get_hl(),
            RegPair::SP => self.sp,
            RegPair::IX => self.ix,
            RegPair::IY => self.iy,
        }
    }

    pub fn set_pair(&mut self, pair: RegPair, val: u16) {
        match pair {
            RegPair::AF => self.set_af(val),
            RegPair::BC => self.set_bc(val),
            RegPair::DE => self.set_de(val),
            RegPair::HL => self.set_hl(val),
            RegPair::SP => self.sp = val,
            RegPair::IX => self.ix = val,
            RegPair::IY => self.iy = val,
        }
    }

    pub fn flag(&self, flag: Flag) -> bool {
        (self.f & flag as u8) != 0
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        if on {
            self.f |= flag as u8;
        } else {
            self.f &= !(flag as u8);
        }
    }

    /// EXX: swap BC, DE, HL with their shadows.
    pub fn exchange_registers(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
    }

    /// EX AF,AF'
    pub fn exchange_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
    }

    /// Bump the 7-bit refresh counter once per opcode fetch. Bit 7 is kept.
    pub fn refresh(&mut self, fetches: u8) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(fetches) & 0x7F);
    }

    /// Equal in everything except the refresh counter.
    pub(crate) fn same_state_ignoring_refresh(&self, other: &Self) -> bool {
        Self { r: 0, ..self.clone() } == Self { r: 0, ..other.clone() }
    }
}
