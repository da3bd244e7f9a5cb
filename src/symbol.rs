use std::fmt;
use std::str::FromStr;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

/// Label name -> resolved address, in definition order.
pub type Labels = IndexMap<String, u16, FxBuildHasher>;

pub fn new_labels() -> Labels {
    IndexMap::with_hasher(FxBuildHasher::default())
}

/// 8-bit registers, numbered by their 3-bit encoding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Register {
    B = 0,
    C = 1,
    D = 2,
    E = 3,
    H = 4,
    L = 5,
    A = 7,
}

impl Register {
    pub const ALL: [Register; 7] = [
        Register::A,
        Register::B,
        Register::C,
        Register::D,
        Register::E,
        Register::H,
        Register::L,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl FromStr for Register {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Register::A),
            "B" => Ok(Register::B),
            "C" => Ok(Register::C),
            "D" => Ok(Register::D),
            "E" => Ok(Register::E),
            "H" => Ok(Register::H),
            "L" => Ok(Register::L),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
            Register::E => "E",
            Register::H => "H",
            Register::L => "L",
        };
        f.write_str(name)
    }
}

/// Operand of the 8-bit instructions: a register, or memory addressed by HL.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RegOrMem {
    Reg(Register),
    Mem,
}

impl RegOrMem {
    pub fn code(self) -> u8 {
        match self {
            RegOrMem::Reg(reg) => reg.code(),
            RegOrMem::Mem => 6,
        }
    }
}

impl FromStr for RegOrMem {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("M") {
            Ok(RegOrMem::Mem)
        } else {
            s.parse().map(RegOrMem::Reg)
        }
    }
}

/// Register pairs addressed by LXI, INX, DCX, DAD, LDAX and STAX.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Pair {
    B = 0,
    D = 1,
    H = 2,
    Sp = 3,
}

impl Pair {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl FromStr for Pair {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "B" => Ok(Pair::B),
            "D" => Ok(Pair::D),
            "H" => Ok(Pair::H),
            "SP" => Ok(Pair::Sp),
            _ => Err(()),
        }
    }
}

/// Register pairs addressed by PUSH and POP. PSW is A plus the flag byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StackPair {
    B = 0,
    D = 1,
    H = 2,
    Psw = 3,
}

impl StackPair {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl FromStr for StackPair {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "B" => Ok(StackPair::B),
            "D" => Ok(StackPair::D),
            "H" => Ok(StackPair::H),
            "PSW" => Ok(StackPair::Psw),
            _ => Err(()),
        }
    }
}

/// Condition tested by the conditional jumps, calls and returns.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Condition {
    /// Zero flag clear
    Nz = 0,
    /// Zero flag set
    Z = 1,
    /// Carry clear
    Nc = 2,
    /// Carry set
    C = 3,
    /// Parity odd
    Po = 4,
    /// Parity even
    Pe = 5,
    /// Sign clear
    P = 6,
    /// Sign set
    M = 7,
}

impl Condition {
    pub fn code(self) -> u8 {
        self as u8
    }

    fn suffix(self) -> &'static str {
        match self {
            Condition::Nz => "NZ",
            Condition::Z => "Z",
            Condition::Nc => "NC",
            Condition::C => "C",
            Condition::Po => "PO",
            Condition::Pe => "PE",
            Condition::P => "P",
            Condition::M => "M",
        }
    }

    fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "NZ" => Some(Condition::Nz),
            "Z" => Some(Condition::Z),
            "NC" => Some(Condition::Nc),
            "C" => Some(Condition::C),
            "PO" => Some(Condition::Po),
            "PE" => Some(Condition::Pe),
            "P" => Some(Condition::P),
            "M" => Some(Condition::M),
            _ => None,
        }
    }
}

/// Arithmetic/logical operation shared by the register and immediate forms.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AluOp {
    Add = 0,
    Adc = 1,
    Sub = 2,
    Sbb = 3,
    Ana = 4,
    Xra = 5,
    Ora = 6,
    Cmp = 7,
}

impl AluOp {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Every mnemonic the assembler understands.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mnemonic {
    Mov,
    Mvi,
    Lxi,
    Lda,
    Sta,
    Lhld,
    Shld,
    Ldax,
    Stax,
    Xchg,
    Alu(AluOp),
    AluImm(AluOp),
    Inr,
    Dcr,
    Inx,
    Dcx,
    Dad,
    Daa,
    Rlc,
    Rrc,
    Ral,
    Rar,
    Cma,
    Cmc,
    Stc,
    Jmp,
    Jcc(Condition),
    Call,
    Ccc(Condition),
    Ret,
    Rcc(Condition),
    Pchl,
    Rst,
    Push,
    Pop,
    Xthl,
    Sphl,
    In,
    Out,
    Ei,
    Di,
    Rim,
    Sim,
    Nop,
    Hlt,
}

impl Mnemonic {
    /// Encoded length in bytes: opcode plus any immediate or address.
    pub fn len(self) -> u16 {
        use Mnemonic::*;
        match self {
            Mvi | AluImm(_) | In | Out => 2,
            Lxi | Lda | Sta | Lhld | Shld | Jmp | Jcc(_) | Call | Ccc(_) => 3,
            _ => 1,
        }
    }
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Mnemonic::*;
        let upper = s.to_ascii_uppercase();
        let mnemonic = match upper.as_str() {
            "MOV" => Mov,
            "MVI" => Mvi,
            "LXI" => Lxi,
            "LDA" => Lda,
            "STA" => Sta,
            "LHLD" => Lhld,
            "SHLD" => Shld,
            "LDAX" => Ldax,
            "STAX" => Stax,
            "XCHG" => Xchg,
            "ADD" => Alu(AluOp::Add),
            "ADC" => Alu(AluOp::Adc),
            "SUB" => Alu(AluOp::Sub),
            "SBB" => Alu(AluOp::Sbb),
            "ANA" => Alu(AluOp::Ana),
            "XRA" => Alu(AluOp::Xra),
            "ORA" => Alu(AluOp::Ora),
            "CMP" => Alu(AluOp::Cmp),
            "ADI" => AluImm(AluOp::Add),
            "ACI" => AluImm(AluOp::Adc),
            "SUI" => AluImm(AluOp::Sub),
            "SBI" => AluImm(AluOp::Sbb),
            "ANI" => AluImm(AluOp::Ana),
            "XRI" => AluImm(AluOp::Xra),
            "ORI" => AluImm(AluOp::Ora),
            "CPI" => AluImm(AluOp::Cmp),
            "INR" => Inr,
            "DCR" => Dcr,
            "INX" => Inx,
            "DCX" => Dcx,
            "DAD" => Dad,
            "DAA" => Daa,
            "RLC" => Rlc,
            "RRC" => Rrc,
            "RAL" => Ral,
            "RAR" => Rar,
            "CMA" => Cma,
            "CMC" => Cmc,
            "STC" => Stc,
            "JMP" => Jmp,
            "CALL" => Call,
            "RET" => Ret,
            "PCHL" => Pchl,
            "RST" => Rst,
            "PUSH" => Push,
            "POP" => Pop,
            "XTHL" => Xthl,
            "SPHL" => Sphl,
            "IN" => In,
            "OUT" => Out,
            "EI" => Ei,
            "DI" => Di,
            "RIM" => Rim,
            "SIM" => Sim,
            "NOP" => Nop,
            "HLT" => Hlt,
            // Conditional forms: J/C/R followed by a condition suffix
            other => {
                let mut chars = other.chars();
                let head = chars.next().ok_or(())?;
                let cond = Condition::from_suffix(chars.as_str()).ok_or(())?;
                match head {
                    'J' => Jcc(cond),
                    'C' => Ccc(cond),
                    'R' => Rcc(cond),
                    _ => return Err(()),
                }
            }
        };
        Ok(mnemonic)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Mnemonic::*;
        let name = match self {
            Mov => "MOV",
            Mvi => "MVI",
            Lxi => "LXI",
            Lda => "LDA",
            Sta => "STA",
            Lhld => "LHLD",
            Shld => "SHLD",
            Ldax => "LDAX",
            Stax => "STAX",
            Xchg => "XCHG",
            Alu(op) => match op {
                AluOp::Add => "ADD",
                AluOp::Adc => "ADC",
                AluOp::Sub => "SUB",
                AluOp::Sbb => "SBB",
                AluOp::Ana => "ANA",
                AluOp::Xra => "XRA",
                AluOp::Ora => "ORA",
                AluOp::Cmp => "CMP",
            },
            AluImm(op) => match op {
                AluOp::Add => "ADI",
                AluOp::Adc => "ACI",
                AluOp::Sub => "SUI",
                AluOp::Sbb => "SBI",
                AluOp::Ana => "ANI",
                AluOp::Xra => "XRI",
                AluOp::Ora => "ORI",
                AluOp::Cmp => "CPI",
            },
            Inr => "INR",
            Dcr => "DCR",
            Inx => "INX",
            Dcx => "DCX",
            Dad => "DAD",
            Daa => "DAA",
            Rlc => "RLC",
            Rrc => "RRC",
            Ral => "RAL",
            Rar => "RAR",
            Cma => "CMA",
            Cmc => "CMC",
            Stc => "STC",
            Jmp => "JMP",
            Jcc(cond) => return write!(f, "J{}", cond.suffix()),
            Call => "CALL",
            Ccc(cond) => return write!(f, "C{}", cond.suffix()),
            Ret => "RET",
            Rcc(cond) => return write!(f, "R{}", cond.suffix()),
            Pchl => "PCHL",
            Rst => "RST",
            Push => "PUSH",
            Pop => "POP",
            Xthl => "XTHL",
            Sphl => "SPHL",
            In => "IN",
            Out => "OUT",
            Ei => "EI",
            Di => "DI",
            Rim => "RIM",
            Sim => "SIM",
            Nop => "NOP",
            Hlt => "HLT",
        };
        f.write_str(name)
    }
}
