use crate::opcode::Instr;
use crate::symbol::RegOrMem::Mem;

impl Instr {
    /// T-states from the 8085 datasheet. `taken` selects the longer count for conditional
    /// jumps, calls and returns; it is ignored by everything else.
    pub fn t_states(&self, taken: bool) -> u32 {
        use Instr::*;
        let (taken_cost, skipped_cost) = match *self {
            Jcc { .. } => (10, 7),
            Ccc { .. } => (18, 9),
            Rcc(_) => (12, 6),
            _ => return self.fixed_t_states(),
        };
        if taken {
            taken_cost
        } else {
            skipped_cost
        }
    }

    fn fixed_t_states(&self) -> u32 {
        use Instr::*;
        match *self {
            Mov { dest: Mem, .. } | Mov { src: Mem, .. } => 7,
            Mov { .. } => 4,
            Mvi { dest: Mem, .. } => 10,
            Mvi { .. } => 7,
            Lxi { .. } => 10,
            Lda(_) | Sta(_) => 13,
            Lhld(_) | Shld(_) => 16,
            Ldax(_) | Stax(_) => 7,
            Xchg => 4,
            Alu { src: Mem, .. } => 7,
            Alu { .. } => 4,
            AluImm { .. } => 7,
            Inr(Mem) | Dcr(Mem) => 10,
            Inr(_) | Dcr(_) => 4,
            Inx(_) | Dcx(_) => 6,
            Dad(_) => 10,
            Daa | Rlc | Rrc | Ral | Rar | Cma | Cmc | Stc => 4,
            Jmp(_) => 10,
            Call(_) => 18,
            Ret => 10,
            Pchl => 6,
            Rst(_) => 12,
            Push(_) => 12,
            Pop(_) => 10,
            Xthl => 16,
            Sphl => 6,
            In(_) | Out(_) => 10,
            Ei | Di | Rim | Sim | Nop => 4,
            Hlt => 5,
            Jcc { .. } | Ccc { .. } | Rcc(_) => unreachable!("conditional costs handled by caller"),
        }
    }
}
