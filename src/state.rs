use crate::symbol::{Pair, Register};

/// Programmer-visible registers. Pairs BC, DE and HL are views over two 8-bit registers,
/// high byte first.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    /// Program counter
    pub pc: u16,
    /// Stack pointer
    pub sp: u16,
}

impl Default for Registers {
    fn default() -> Self {
        Registers {
            a: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            pc: 0,
            sp: 0xFFFF,
        }
    }
}

impl Registers {
    pub fn get(&self, reg: Register) -> u8 {
        match reg {
            Register::A => self.a,
            Register::B => self.b,
            Register::C => self.c,
            Register::D => self.d,
            Register::E => self.e,
            Register::H => self.h,
            Register::L => self.l,
        }
    }

    pub fn set(&mut self, reg: Register, value: u8) {
        *match reg {
            Register::A => &mut self.a,
            Register::B => &mut self.b,
            Register::C => &mut self.c,
            Register::D => &mut self.d,
            Register::E => &mut self.e,
            Register::H => &mut self.h,
            Register::L => &mut self.l,
        } = value;
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    pub fn pair(&self, pair: Pair) -> u16 {
        match pair {
            Pair::B => self.bc(),
            Pair::D => self.de(),
            Pair::H => self.hl(),
            Pair::Sp => self.sp,
        }
    }

    pub fn set_pair(&mut self, pair: Pair, value: u16) {
        match pair {
            Pair::B => self.set_bc(value),
            Pair::D => self.set_de(value),
            Pair::H => self.set_hl(value),
            Pair::Sp => self.sp = value,
        }
    }
}

/// Condition flags.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Flags {
    /// Sign: bit 7 of the result
    pub s: bool,
    /// Zero
    pub z: bool,
    /// Auxiliary carry out of bit 3
    pub ac: bool,
    /// Parity: set when the result has an even number of 1 bits
    pub p: bool,
    /// Carry
    pub cy: bool,
}

impl Flags {
    /// Sign, zero and parity from an 8-bit result.
    pub fn set_szp(&mut self, value: u8) {
        self.s = value & 0x80 != 0;
        self.z = value == 0;
        self.p = value.count_ones() % 2 == 0;
    }

    /// Flag byte as pushed with PSW: `S Z 0 AC 0 P 1 CY`.
    pub fn to_byte(self) -> u8 {
        (self.s as u8) << 7
            | (self.z as u8) << 6
            | (self.ac as u8) << 4
            | (self.p as u8) << 2
            | 0b10
            | self.cy as u8
    }

    /// Inverse of [`Flags::to_byte`]. Fixed bits are ignored.
    pub fn from_byte(byte: u8) -> Self {
        Flags {
            s: byte & 0x80 != 0,
            z: byte & 0x40 != 0,
            ac: byte & 0x10 != 0,
            p: byte & 0x04 != 0,
            cy: byte & 0x01 != 0,
        }
    }
}
