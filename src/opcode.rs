//! Opcode table for the 8085 instruction set.
//!
//! Instructions are a closed enumeration with structured operands. The assembler builds a
//! [`Template`] from a mnemonic and its operand tokens; the single immediate or address operand
//! an instruction may carry is left as a placeholder and patched once labels are known.

use crate::lexer::parse_literal;
use crate::symbol::{AluOp, Condition, Mnemonic, Pair, RegOrMem, StackPair};

/// Opcode of `HLT`, also checked when fetching outside the assembled program.
pub const HLT_OPCODE: u8 = 0x76;

/// A fully decoded instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instr {
    Mov { dest: RegOrMem, src: RegOrMem },
    Mvi { dest: RegOrMem, imm: u8 },
    Lxi { pair: Pair, imm: u16 },
    Lda(u16),
    Sta(u16),
    Lhld(u16),
    Shld(u16),
    Ldax(Pair),
    Stax(Pair),
    Xchg,
    Alu { op: AluOp, src: RegOrMem },
    AluImm { op: AluOp, imm: u8 },
    Inr(RegOrMem),
    Dcr(RegOrMem),
    Inx(Pair),
    Dcx(Pair),
    Dad(Pair),
    Daa,
    Rlc,
    Rrc,
    Ral,
    Rar,
    Cma,
    Cmc,
    Stc,
    Jmp(u16),
    Jcc { cond: Condition, addr: u16 },
    Call(u16),
    Ccc { cond: Condition, addr: u16 },
    Ret,
    Rcc(Condition),
    Pchl,
    /// Restart vector, 0 to 7
    Rst(u8),
    Push(StackPair),
    Pop(StackPair),
    Xthl,
    Sphl,
    In(u8),
    Out(u8),
    Ei,
    Di,
    Rim,
    Sim,
    Nop,
    Hlt,
}

impl Instr {
    pub fn mnemonic(&self) -> Mnemonic {
        use Instr::*;
        match *self {
            Mov { .. } => Mnemonic::Mov,
            Mvi { .. } => Mnemonic::Mvi,
            Lxi { .. } => Mnemonic::Lxi,
            Lda(_) => Mnemonic::Lda,
            Sta(_) => Mnemonic::Sta,
            Lhld(_) => Mnemonic::Lhld,
            Shld(_) => Mnemonic::Shld,
            Ldax(_) => Mnemonic::Ldax,
            Stax(_) => Mnemonic::Stax,
            Xchg => Mnemonic::Xchg,
            Alu { op, .. } => Mnemonic::Alu(op),
            AluImm { op, .. } => Mnemonic::AluImm(op),
            Inr(_) => Mnemonic::Inr,
            Dcr(_) => Mnemonic::Dcr,
            Inx(_) => Mnemonic::Inx,
            Dcx(_) => Mnemonic::Dcx,
            Dad(_) => Mnemonic::Dad,
            Daa => Mnemonic::Daa,
            Rlc => Mnemonic::Rlc,
            Rrc => Mnemonic::Rrc,
            Ral => Mnemonic::Ral,
            Rar => Mnemonic::Rar,
            Cma => Mnemonic::Cma,
            Cmc => Mnemonic::Cmc,
            Stc => Mnemonic::Stc,
            Jmp(_) => Mnemonic::Jmp,
            Jcc { cond, .. } => Mnemonic::Jcc(cond),
            Call(_) => Mnemonic::Call,
            Ccc { cond, .. } => Mnemonic::Ccc(cond),
            Ret => Mnemonic::Ret,
            Rcc(cond) => Mnemonic::Rcc(cond),
            Pchl => Mnemonic::Pchl,
            Rst(_) => Mnemonic::Rst,
            Push(_) => Mnemonic::Push,
            Pop(_) => Mnemonic::Pop,
            Xthl => Mnemonic::Xthl,
            Sphl => Mnemonic::Sphl,
            In(_) => Mnemonic::In,
            Out(_) => Mnemonic::Out,
            Ei => Mnemonic::Ei,
            Di => Mnemonic::Di,
            Rim => Mnemonic::Rim,
            Sim => Mnemonic::Sim,
            Nop => Mnemonic::Nop,
            Hlt => Mnemonic::Hlt,
        }
    }

    pub fn len(&self) -> u16 {
        self.mnemonic().len()
    }

    /// The first byte of the encoding.
    pub fn opcode(&self) -> u8 {
        use Instr::*;
        match *self {
            Mov { dest, src } => 0x40 | dest.code() << 3 | src.code(),
            Mvi { dest, .. } => 0x06 | dest.code() << 3,
            Lxi { pair, .. } => 0x01 | pair.code() << 4,
            Lda(_) => 0x3A,
            Sta(_) => 0x32,
            Lhld(_) => 0x2A,
            Shld(_) => 0x22,
            Ldax(pair) => 0x0A | pair.code() << 4,
            Stax(pair) => 0x02 | pair.code() << 4,
            Xchg => 0xEB,
            Alu { op, src } => 0x80 | op.code() << 3 | src.code(),
            AluImm { op, .. } => 0xC6 | op.code() << 3,
            Inr(dest) => 0x04 | dest.code() << 3,
            Dcr(dest) => 0x05 | dest.code() << 3,
            Inx(pair) => 0x03 | pair.code() << 4,
            Dcx(pair) => 0x0B | pair.code() << 4,
            Dad(pair) => 0x09 | pair.code() << 4,
            Daa => 0x27,
            Rlc => 0x07,
            Rrc => 0x0F,
            Ral => 0x17,
            Rar => 0x1F,
            Cma => 0x2F,
            Cmc => 0x3F,
            Stc => 0x37,
            Jmp(_) => 0xC3,
            Jcc { cond, .. } => 0xC2 | cond.code() << 3,
            Call(_) => 0xCD,
            Ccc { cond, .. } => 0xC4 | cond.code() << 3,
            Ret => 0xC9,
            Rcc(cond) => 0xC0 | cond.code() << 3,
            Pchl => 0xE9,
            Rst(n) => 0xC7 | (n & 0b111) << 3,
            Push(pair) => 0xC5 | pair.code() << 4,
            Pop(pair) => 0xC1 | pair.code() << 4,
            Xthl => 0xE3,
            Sphl => 0xF9,
            In(_) => 0xDB,
            Out(_) => 0xD3,
            Ei => 0xFB,
            Di => 0xF3,
            Rim => 0x20,
            Sim => 0x30,
            Nop => 0x00,
            Hlt => HLT_OPCODE,
        }
    }

    /// Opcode followed by the operand bytes, little-endian for 16-bit values.
    pub fn encode(&self) -> Vec<u8> {
        use Instr::*;
        let mut bytes = vec![self.opcode()];
        match *self {
            Mvi { imm, .. } | AluImm { imm, .. } | In(imm) | Out(imm) => bytes.push(imm),
            Lxi { imm: word, .. }
            | Lda(word)
            | Sta(word)
            | Lhld(word)
            | Shld(word)
            | Jmp(word)
            | Jcc { addr: word, .. }
            | Call(word)
            | Ccc { addr: word, .. } => bytes.extend_from_slice(&word.to_le_bytes()),
            _ => {}
        }
        debug_assert_eq!(bytes.len(), self.len() as usize);
        bytes
    }

    /// Fill in the immediate or address operand. 8-bit operands keep the low byte.
    pub fn patch(&mut self, value: u16) {
        use Instr::*;
        match self {
            Mvi { imm, .. } | AluImm { imm, .. } | In(imm) | Out(imm) => *imm = value as u8,
            Lxi { imm: word, .. }
            | Lda(word)
            | Sta(word)
            | Lhld(word)
            | Shld(word)
            | Jmp(word)
            | Jcc { addr: word, .. }
            | Call(word)
            | Ccc { addr: word, .. } => *word = value,
            _ => {}
        }
    }
}

/// Instruction shape built from source tokens, before values are resolved.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Template {
    pub instr: Instr,
    /// Index of the operand holding the immediate or address, if any.
    pub value: Option<usize>,
    /// Count of operands beyond those the instruction takes.
    pub surplus: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LookupError {
    UnknownMnemonic,
    Missing { expected: &'static str },
    BadOperand { index: usize, expected: &'static str },
}

/// Cursor over the operand tokens of one instruction.
struct Operands<'a> {
    toks: &'a [&'a str],
    next: usize,
    value: Option<usize>,
}

impl<'a> Operands<'a> {
    fn new(toks: &'a [&'a str]) -> Self {
        Operands {
            toks,
            next: 0,
            value: None,
        }
    }

    fn take(&mut self, expected: &'static str) -> Result<(usize, &'a str), LookupError> {
        let index = self.next;
        let tok = self
            .toks
            .get(index)
            .ok_or(LookupError::Missing { expected })?;
        self.next += 1;
        Ok((index, tok))
    }

    fn parse<T: std::str::FromStr>(&mut self, expected: &'static str) -> Result<T, LookupError> {
        let (index, tok) = self.take(expected)?;
        tok.parse()
            .map_err(|_| LookupError::BadOperand { index, expected })
    }

    fn reg_or_mem(&mut self) -> Result<RegOrMem, LookupError> {
        self.parse("register or M")
    }

    fn pair(&mut self) -> Result<Pair, LookupError> {
        self.parse("register pair B, D, H or SP")
    }

    /// LDAX and STAX only address through BC or DE.
    fn pointer_pair(&mut self) -> Result<Pair, LookupError> {
        const EXPECTED: &str = "register pair B or D";
        let index = self.next;
        match self.parse::<Pair>(EXPECTED)? {
            pair @ (Pair::B | Pair::D) => Ok(pair),
            _ => Err(LookupError::BadOperand {
                index,
                expected: EXPECTED,
            }),
        }
    }

    fn stack_pair(&mut self) -> Result<StackPair, LookupError> {
        self.parse("register pair B, D, H or PSW")
    }

    /// Leaves the value unresolved; only its position is recorded.
    fn value(&mut self, expected: &'static str) -> Result<(), LookupError> {
        let (index, _) = self.take(expected)?;
        self.value = Some(index);
        Ok(())
    }

    fn vector(&mut self) -> Result<u8, LookupError> {
        const EXPECTED: &str = "restart number 0 to 7";
        let (index, tok) = self.take(EXPECTED)?;
        match parse_literal(tok) {
            Some(n @ 0..=7) => Ok(n as u8),
            _ => Err(LookupError::BadOperand {
                index,
                expected: EXPECTED,
            }),
        }
    }

    fn surplus(&self) -> usize {
        self.toks.len().saturating_sub(self.next)
    }
}

/// Build the instruction shape for a mnemonic and its operand tokens.
///
/// Surplus operands are not an error here: the caller decides whether to tolerate them.
pub fn template(mnemonic: &str, operands: &[&str]) -> Result<Template, LookupError> {
    use Mnemonic as M;
    const BYTE: &str = "8-bit value";
    const WORD: &str = "16-bit value or label";

    let mnemonic: Mnemonic = mnemonic
        .parse()
        .map_err(|_| LookupError::UnknownMnemonic)?;
    let mut args = Operands::new(operands);

    let instr = match mnemonic {
        M::Mov => {
            let dest = args.reg_or_mem()?;
            let src = args.reg_or_mem()?;
            if dest == RegOrMem::Mem && src == RegOrMem::Mem {
                // Occupied by HLT
                return Err(LookupError::BadOperand {
                    index: 1,
                    expected: "register (MOV M,M does not exist)",
                });
            }
            Instr::Mov { dest, src }
        }
        M::Mvi => {
            let dest = args.reg_or_mem()?;
            args.value(BYTE)?;
            Instr::Mvi { dest, imm: 0 }
        }
        M::Lxi => {
            let pair = args.pair()?;
            args.value(WORD)?;
            Instr::Lxi { pair, imm: 0 }
        }
        M::Lda => {
            args.value(WORD)?;
            Instr::Lda(0)
        }
        M::Sta => {
            args.value(WORD)?;
            Instr::Sta(0)
        }
        M::Lhld => {
            args.value(WORD)?;
            Instr::Lhld(0)
        }
        M::Shld => {
            args.value(WORD)?;
            Instr::Shld(0)
        }
        M::Ldax => Instr::Ldax(args.pointer_pair()?),
        M::Stax => Instr::Stax(args.pointer_pair()?),
        M::Xchg => Instr::Xchg,
        M::Alu(op) => Instr::Alu {
            op,
            src: args.reg_or_mem()?,
        },
        M::AluImm(op) => {
            args.value(BYTE)?;
            Instr::AluImm { op, imm: 0 }
        }
        M::Inr => Instr::Inr(args.reg_or_mem()?),
        M::Dcr => Instr::Dcr(args.reg_or_mem()?),
        M::Inx => Instr::Inx(args.pair()?),
        M::Dcx => Instr::Dcx(args.pair()?),
        M::Dad => Instr::Dad(args.pair()?),
        M::Daa => Instr::Daa,
        M::Rlc => Instr::Rlc,
        M::Rrc => Instr::Rrc,
        M::Ral => Instr::Ral,
        M::Rar => Instr::Rar,
        M::Cma => Instr::Cma,
        M::Cmc => Instr::Cmc,
        M::Stc => Instr::Stc,
        M::Jmp => {
            args.value(WORD)?;
            Instr::Jmp(0)
        }
        M::Jcc(cond) => {
            args.value(WORD)?;
            Instr::Jcc { cond, addr: 0 }
        }
        M::Call => {
            args.value(WORD)?;
            Instr::Call(0)
        }
        M::Ccc(cond) => {
            args.value(WORD)?;
            Instr::Ccc { cond, addr: 0 }
        }
        M::Ret => Instr::Ret,
        M::Rcc(cond) => Instr::Rcc(cond),
        M::Pchl => Instr::Pchl,
        M::Rst => Instr::Rst(args.vector()?),
        M::Push => Instr::Push(args.stack_pair()?),
        M::Pop => Instr::Pop(args.stack_pair()?),
        M::Xthl => Instr::Xthl,
        M::Sphl => Instr::Sphl,
        M::In => {
            args.value("port number")?;
            Instr::In(0)
        }
        M::Out => {
            args.value("port number")?;
            Instr::Out(0)
        }
        M::Ei => Instr::Ei,
        M::Di => Instr::Di,
        M::Rim => Instr::Rim,
        M::Sim => Instr::Sim,
        M::Nop => Instr::Nop,
        M::Hlt => Instr::Hlt,
    };

    Ok(Template {
        instr,
        value: args.value,
        surplus: args.surplus(),
    })
}

/// Opcode for a signature such as `MOV A,B` or `MVI A,05H`.
///
/// Immediate and address operands do not take part in the lookup.
pub fn lookup(signature: &str) -> Option<u8> {
    let mut words = signature
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|word| !word.is_empty());
    let mnemonic = words.next()?;
    let operands: Vec<&str> = words.collect();
    template(mnemonic, &operands)
        .ok()
        .map(|template| template.instr.opcode())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::symbol::Register;

    #[test]
    fn data_transfer_opcodes() {
        assert_eq!(lookup("MOV A,B"), Some(0x78));
        assert_eq!(lookup("MOV M,A"), Some(0x77));
        assert_eq!(lookup("MOV B,M"), Some(0x46));
        assert_eq!(lookup("MVI A,05H"), Some(0x3E));
        assert_eq!(lookup("MVI M,0"), Some(0x36));
        assert_eq!(lookup("LXI SP,0FFFFH"), Some(0x31));
        assert_eq!(lookup("LXI H,2050H"), Some(0x21));
        assert_eq!(lookup("LDAX D"), Some(0x1A));
        assert_eq!(lookup("STAX B"), Some(0x02));
        assert_eq!(lookup("XCHG"), Some(0xEB));
    }

    #[test]
    fn arithmetic_and_logical_opcodes() {
        assert_eq!(lookup("ADD B"), Some(0x80));
        assert_eq!(lookup("ADC M"), Some(0x8E));
        assert_eq!(lookup("SUB A"), Some(0x97));
        assert_eq!(lookup("CMP E"), Some(0xBB));
        assert_eq!(lookup("ANA A"), Some(0xA7));
        assert_eq!(lookup("ORI 0FH"), Some(0xF6));
        assert_eq!(lookup("CPI 05H"), Some(0xFE));
        assert_eq!(lookup("INR M"), Some(0x34));
        assert_eq!(lookup("DCR A"), Some(0x3D));
        assert_eq!(lookup("INX SP"), Some(0x33));
        assert_eq!(lookup("DCX H"), Some(0x2B));
        assert_eq!(lookup("DAD D"), Some(0x19));
    }

    #[test]
    fn branch_and_stack_opcodes() {
        assert_eq!(lookup("JMP START"), Some(0xC3));
        assert_eq!(lookup("JNZ LOOP"), Some(0xC2));
        assert_eq!(lookup("JM 8000H"), Some(0xFA));
        assert_eq!(lookup("CZ SUB1"), Some(0xCC));
        assert_eq!(lookup("RPE"), Some(0xE8));
        assert_eq!(lookup("RST 7"), Some(0xFF));
        assert_eq!(lookup("RST 0"), Some(0xC7));
        assert_eq!(lookup("PUSH PSW"), Some(0xF5));
        assert_eq!(lookup("POP B"), Some(0xC1));
        assert_eq!(lookup("OUT 01H"), Some(0xD3));
        assert_eq!(lookup("HLT"), Some(0x76));
        assert_eq!(lookup("RIM"), Some(0x20));
    }

    #[test]
    fn rejects_invalid_signatures() {
        assert_eq!(lookup("MOV M,M"), None);
        assert_eq!(lookup("MOV A"), None);
        assert_eq!(lookup("LDAX H"), None);
        assert_eq!(lookup("PUSH SP"), None);
        assert_eq!(lookup("POP PSW"), Some(0xF1));
        assert_eq!(lookup("RST 8"), None);
        assert_eq!(lookup("FOO A"), None);
        assert_eq!(lookup(""), None);
    }

    #[test]
    fn template_records_value_position_and_surplus() {
        let t = template("MVI", &["b", "12H"]).unwrap();
        assert_eq!(
            t.instr,
            Instr::Mvi {
                dest: RegOrMem::Reg(Register::B),
                imm: 0
            }
        );
        assert_eq!(t.value, Some(1));
        assert_eq!(t.surplus, 0);

        let t = template("nop", &["x", "y"]).unwrap();
        assert_eq!(t.instr, Instr::Nop);
        assert_eq!(t.surplus, 2);

        assert_eq!(
            template("LXI", &["Q", "10"]),
            Err(LookupError::BadOperand {
                index: 0,
                expected: "register pair B, D, H or SP"
            })
        );
        assert_eq!(
            template("JMP", &[]),
            Err(LookupError::Missing {
                expected: "16-bit value or label"
            })
        );
    }

    #[test]
    fn encode_is_little_endian() {
        let mut instr = Instr::Lxi {
            pair: Pair::H,
            imm: 0,
        };
        instr.patch(0x2050);
        assert_eq!(instr.encode(), vec![0x21, 0x50, 0x20]);

        let mut instr = Instr::Mvi {
            dest: RegOrMem::Reg(Register::A),
            imm: 0,
        };
        instr.patch(0x1FF);
        assert_eq!(instr.encode(), vec![0x3E, 0xFF]);
    }
}
