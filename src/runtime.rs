use miette::Result;

use crate::air::Assembly;
use crate::error::Fault;
use crate::memory::Memory;
use crate::opcode::{Instr, HLT_OPCODE};
use crate::options::Options;
use crate::program::{Program, LOAD_ADDRESS};
use crate::state::{Flags, Registers};
use crate::symbol::{AluOp, Condition, RegOrMem, StackPair};

/// Result of a single [`Simulator::step`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    /// One instruction ran (including a `HLT`, which also halts).
    Executed,
    /// Nothing ran: already halted, or a `HLT` byte was fetched outside the program.
    Halted,
    /// Nothing ran: no instruction at PC. State is left as it was.
    Fault(Fault),
}

impl StepOutcome {
    /// Whether the step made progress.
    pub fn progressed(&self) -> bool {
        matches!(self, StepOutcome::Executed)
    }
}

/// Why [`Simulator::run`] returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stop {
    Halted,
    StepLimit,
    Fault(Fault),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RunSummary {
    pub steps: usize,
    pub stop: Stop,
}

/// Result of one [`Simulator::tick`] of a slow run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tick {
    /// Keep scheduling ticks.
    Continue,
    /// The processor is halted. `executed` is true when an instruction ran on this tick,
    /// i.e. the `HLT` itself.
    Halted { executed: bool },
    /// [`Simulator::stop`] was called.
    Stopped,
    Fault(Fault),
}

/// Outcome of [`Simulator::assemble`] that did not hit a hard error.
pub struct AssembleReport {
    /// False when nothing was assembled.
    pub success: bool,
    pub message: String,
    pub instructions: usize,
    pub warnings: Vec<miette::Report>,
}

/// Next PC and whether a conditional control transfer was taken.
struct Control {
    next: u16,
    taken: bool,
}

/// One simulation session: processor state, memory and the assembled program.
pub struct Simulator {
    options: Options,
    reg: Registers,
    flags: Flags,
    mem: Memory,
    program: Program,
    halted: bool,
    stop_requested: bool,
    /// Cumulative T-states
    t_states: u64,
    last_line: Option<usize>,
}

impl Default for Simulator {
    fn default() -> Self {
        Simulator::new(Options::default())
    }
}

impl Simulator {
    pub fn new(options: Options) -> Self {
        Simulator {
            options,
            reg: Registers::default(),
            flags: Flags::default(),
            mem: Memory::new(),
            program: Program::default(),
            halted: false,
            stop_requested: false,
            t_states: 0,
            last_line: None,
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Back to power-on state: registers, flags, memory, program and timing.
    pub fn reset(&mut self) {
        self.reg = Registers::default();
        self.flags = Flags::default();
        self.mem.clear();
        self.program = Program::default();
        self.halted = false;
        self.stop_requested = false;
        self.t_states = 0;
        self.last_line = None;
    }

    /// Assemble `src` at 8000H and load it.
    ///
    /// Memory is not cleared first, so results of a previous run stay visible. Registers,
    /// flags and T-states are untouched; PC moves to 8000H if anything was assembled.
    pub fn assemble(&mut self, src: &str) -> Result<AssembleReport> {
        self.program = Program::default();
        self.halted = false;
        self.stop_requested = false;
        self.last_line = None;

        let Assembly { program, warnings } = crate::assemble(src, self.options.strictness)?;
        self.mem.load(LOAD_ADDRESS, program.image());
        let instructions = program.len();
        self.program = program;

        let success = instructions > 0;
        let mut message = if success {
            self.reg.pc = LOAD_ADDRESS;
            format!("Assembled {instructions} instructions to {LOAD_ADDRESS:04X}H")
        } else {
            "No instructions assembled".to_string()
        };
        if !warnings.is_empty() {
            let plural = if warnings.len() == 1 { "" } else { "s" };
            message += &format!(" ({} warning{plural})", warnings.len());
        }
        log::info!("{message}");

        Ok(AssembleReport {
            success,
            message,
            instructions,
            warnings,
        })
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) -> StepOutcome {
        if self.halted {
            return StepOutcome::Halted;
        }
        let pc = self.reg.pc;
        let Some(record) = self.program.get(pc) else {
            let byte = self.mem.read(pc);
            if byte == HLT_OPCODE {
                self.halted = true;
                return StepOutcome::Halted;
            }
            let fault = Fault { addr: pc, byte };
            log::warn!("{fault}");
            return StepOutcome::Fault(fault);
        };
        let instr = record.instr;
        log::debug!(
            "{pc:04X}H  {:<4} {}  (line {})",
            record.mnemonic.to_string(),
            record.operands.join(","),
            record.line
        );
        self.last_line = Some(record.line);

        let fallthrough = pc.wrapping_add(instr.len());
        let control = self.execute(instr, pc, fallthrough);
        self.reg.pc = control.next;
        self.t_states += instr.t_states(control.taken) as u64;
        StepOutcome::Executed
    }

    /// Step until halted, faulted or the configured step ceiling is reached.
    pub fn run(&mut self) -> RunSummary {
        let mut steps = 0;
        while steps < self.options.max_steps {
            match self.step() {
                StepOutcome::Executed => steps += 1,
                StepOutcome::Halted => break,
                StepOutcome::Fault(fault) => {
                    return RunSummary {
                        steps,
                        stop: Stop::Fault(fault),
                    }
                }
            }
            if self.halted {
                break;
            }
        }
        let stop = if self.halted {
            Stop::Halted
        } else {
            Stop::StepLimit
        };
        RunSummary { steps, stop }
    }

    /// One step of a slow run driven by an external timer. Checks for halt and stop requests
    /// before and after stepping; anything but [`Tick::Continue`] means stop scheduling.
    pub fn tick(&mut self) -> Tick {
        if self.stop_requested {
            return Tick::Stopped;
        }
        if self.halted {
            return Tick::Halted { executed: false };
        }
        match self.step() {
            StepOutcome::Fault(fault) => Tick::Fault(fault),
            StepOutcome::Halted => Tick::Halted { executed: false },
            StepOutcome::Executed if self.halted => Tick::Halted { executed: true },
            StepOutcome::Executed => Tick::Continue,
        }
    }

    /// Cooperative cancel of a run in progress.
    pub fn stop(&mut self) {
        log::warn!("stopped by user at {:04X}H", self.reg.pc);
        self.stop_requested = true;
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn registers(&self) -> Registers {
        self.reg
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn pc(&self) -> u16 {
        self.reg.pc
    }

    pub fn t_states(&self) -> u64 {
        self.t_states
    }

    pub fn memory(&self, addr: u16) -> u8 {
        self.mem.read(addr)
    }

    /// Patch memory directly. Takes effect immediately, even mid-run.
    pub fn set_memory(&mut self, addr: u16, value: u8) {
        self.mem.write(addr, value);
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Source line of the instruction at `addr`.
    pub fn source_line(&self, addr: u16) -> Option<usize> {
        self.program.source_line(addr)
    }

    /// Source line of the most recently executed instruction.
    pub fn last_source_line(&self) -> Option<usize> {
        self.last_line
    }

    fn execute(&mut self, instr: Instr, pc: u16, fallthrough: u16) -> Control {
        use Instr::*;
        let mut next = fallthrough;
        let mut taken = false;

        match instr {
            // Data transfer
            Mov { dest, src } => {
                let value = self.load(src);
                self.store(dest, value);
            }
            Mvi { dest, imm } => self.store(dest, imm),
            Lxi { pair, imm } => self.reg.set_pair(pair, imm),
            Lda(addr) => self.reg.a = self.mem.read(addr),
            Sta(addr) => self.mem.write(addr, self.reg.a),
            Lhld(addr) => {
                let value = self.mem.read_word(addr);
                self.reg.set_hl(value);
            }
            Shld(addr) => self.mem.write_word(addr, self.reg.hl()),
            Ldax(pair) => self.reg.a = self.mem.read(self.reg.pair(pair)),
            Stax(pair) => self.mem.write(self.reg.pair(pair), self.reg.a),
            Xchg => {
                let hl = self.reg.hl();
                self.reg.set_hl(self.reg.de());
                self.reg.set_de(hl);
            }

            // Arithmetic and logical
            Alu { op, src } => {
                let value = self.load(src);
                self.alu(op, value);
            }
            AluImm { op, imm } => self.alu(op, imm),
            Inr(dest) => {
                let value = self.load(dest);
                let res = value.wrapping_add(1);
                self.flags.set_szp(res);
                self.flags.ac = value & 0x0F == 0x0F;
                self.store(dest, res);
            }
            Dcr(dest) => {
                let value = self.load(dest);
                let res = value.wrapping_sub(1);
                self.flags.set_szp(res);
                // Borrow into the low nibble; hardware adds FFH
                self.flags.ac = value & 0x0F != 0;
                self.store(dest, res);
            }
            Inx(pair) => {
                let value = self.reg.pair(pair).wrapping_add(1);
                self.reg.set_pair(pair, value);
            }
            Dcx(pair) => {
                let value = self.reg.pair(pair).wrapping_sub(1);
                self.reg.set_pair(pair, value);
            }
            Dad(pair) => {
                let (res, carry) = self.reg.hl().overflowing_add(self.reg.pair(pair));
                self.reg.set_hl(res);
                self.flags.cy = carry;
            }
            Daa => self.daa(),
            Rlc => {
                self.flags.cy = self.reg.a & 0x80 != 0;
                self.reg.a = self.reg.a.rotate_left(1);
            }
            Rrc => {
                self.flags.cy = self.reg.a & 0x01 != 0;
                self.reg.a = self.reg.a.rotate_right(1);
            }
            Ral => {
                let carry_in = self.flags.cy as u8;
                self.flags.cy = self.reg.a & 0x80 != 0;
                self.reg.a = self.reg.a << 1 | carry_in;
            }
            Rar => {
                let carry_in = self.flags.cy as u8;
                self.flags.cy = self.reg.a & 0x01 != 0;
                self.reg.a = self.reg.a >> 1 | carry_in << 7;
            }
            Cma => self.reg.a = !self.reg.a,
            Cmc => self.flags.cy = !self.flags.cy,
            Stc => self.flags.cy = true,

            // Branching
            Jmp(addr) => next = addr,
            Jcc { cond, addr } => {
                taken = self.test(cond);
                if taken {
                    next = addr;
                }
            }
            Call(addr) => {
                self.push(fallthrough);
                next = addr;
            }
            Ccc { cond, addr } => {
                taken = self.test(cond);
                if taken {
                    self.push(fallthrough);
                    next = addr;
                }
            }
            Ret => next = self.pop(),
            Rcc(cond) => {
                taken = self.test(cond);
                if taken {
                    next = self.pop();
                }
            }
            Pchl => next = self.reg.hl(),
            Rst(n) => {
                self.push(fallthrough);
                next = n as u16 * 8;
            }

            // Stack and machine control
            Push(pair) => {
                let value = match pair {
                    StackPair::B => self.reg.bc(),
                    StackPair::D => self.reg.de(),
                    StackPair::H => self.reg.hl(),
                    StackPair::Psw => u16::from_be_bytes([self.reg.a, self.flags.to_byte()]),
                };
                self.push(value);
            }
            Pop(pair) => {
                let value = self.pop();
                match pair {
                    StackPair::B => self.reg.set_bc(value),
                    StackPair::D => self.reg.set_de(value),
                    StackPair::H => self.reg.set_hl(value),
                    StackPair::Psw => {
                        let [a, flags] = value.to_be_bytes();
                        self.reg.a = a;
                        self.flags = Flags::from_byte(flags);
                    }
                }
            }
            Xthl => {
                let top = self.mem.read_word(self.reg.sp);
                self.mem.write_word(self.reg.sp, self.reg.hl());
                self.reg.set_hl(top);
            }
            Sphl => self.reg.sp = self.reg.hl(),
            // No device model: port accesses are only logged
            In(port) => log::info!("IN {port:02X}H"),
            Out(port) => log::info!("OUT {port:02X}H <- {:02X}H", self.reg.a),
            Ei | Di | Rim | Sim | Nop => {}
            Hlt => {
                self.halted = true;
                next = pc;
            }
        }

        Control { next, taken }
    }

    fn load(&self, src: RegOrMem) -> u8 {
        match src {
            RegOrMem::Reg(reg) => self.reg.get(reg),
            RegOrMem::Mem => self.mem.read(self.reg.hl()),
        }
    }

    fn store(&mut self, dest: RegOrMem, value: u8) {
        match dest {
            RegOrMem::Reg(reg) => self.reg.set(reg, value),
            RegOrMem::Mem => self.mem.write(self.reg.hl(), value),
        }
    }

    fn alu(&mut self, op: AluOp, value: u8) {
        let a = self.reg.a;
        let carry = self.flags.cy as u8;
        match op {
            AluOp::Add => self.reg.a = self.add(a, value, 0),
            AluOp::Adc => self.reg.a = self.add(a, value, carry),
            AluOp::Sub => self.reg.a = self.sub(a, value, 0),
            AluOp::Sbb => self.reg.a = self.sub(a, value, carry),
            AluOp::Cmp => {
                self.sub(a, value, 0);
            }
            AluOp::Ana => self.reg.a = self.logical(a & value),
            AluOp::Xra => self.reg.a = self.logical(a ^ value),
            AluOp::Ora => self.reg.a = self.logical(a | value),
        }
    }

    fn add(&mut self, a: u8, b: u8, carry: u8) -> u8 {
        let res = a as u16 + b as u16 + carry as u16;
        self.flags.ac = (a & 0x0F) + (b & 0x0F) + carry > 0x0F;
        self.flags.cy = res > 0xFF;
        self.flags.set_szp(res as u8);
        res as u8
    }

    /// Carry is set on borrow. Auxiliary carry follows the hardware, which adds the
    /// complement of the operand.
    fn sub(&mut self, a: u8, b: u8, borrow: u8) -> u8 {
        let res = a as i16 - b as i16 - borrow as i16;
        self.flags.ac = (a & 0x0F) + (!b & 0x0F) + (1 - borrow) > 0x0F;
        self.flags.cy = res < 0;
        self.flags.set_szp(res as u8);
        res as u8
    }

    fn logical(&mut self, res: u8) -> u8 {
        self.flags.set_szp(res);
        self.flags.cy = false;
        self.flags.ac = false;
        res
    }

    fn daa(&mut self) {
        let a = self.reg.a;
        let low = a & 0x0F;
        let high = a >> 4;
        let mut correction = 0;
        if low > 9 || self.flags.ac {
            correction |= 0x06;
        }
        if high > 9 || self.flags.cy || (high >= 9 && low > 9) {
            correction |= 0x60;
            self.flags.cy = true;
        }
        let res = a.wrapping_add(correction);
        self.flags.ac = low + (correction & 0x0F) > 0x0F;
        self.flags.set_szp(res);
        self.reg.a = res;
    }

    fn test(&self, cond: Condition) -> bool {
        match cond {
            Condition::Nz => !self.flags.z,
            Condition::Z => self.flags.z,
            Condition::Nc => !self.flags.cy,
            Condition::C => self.flags.cy,
            Condition::Po => !self.flags.p,
            Condition::Pe => self.flags.p,
            Condition::P => !self.flags.s,
            Condition::M => self.flags.s,
        }
    }

    /// High byte at SP-1, low byte at SP-2.
    fn push(&mut self, value: u16) {
        self.reg.sp = self.reg.sp.wrapping_sub(2);
        self.mem.write_word(self.reg.sp, value);
    }

    fn pop(&mut self) -> u16 {
        let value = self.mem.read_word(self.reg.sp);
        self.reg.sp = self.reg.sp.wrapping_add(2);
        value
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::Strictness;

    fn sim(src: &str) -> Simulator {
        let mut sim = Simulator::default();
        let report = sim.assemble(src).unwrap();
        assert!(report.success, "{}", report.message);
        sim
    }

    fn run(src: &str) -> Simulator {
        let mut sim = sim(src);
        let summary = sim.run();
        assert_eq!(summary.stop, Stop::Halted);
        sim
    }

    #[test]
    fn immediate_add() {
        let sim = run("MVI A,05H\nADI 03H\nHLT");
        assert_eq!(sim.registers().a, 0x08);
        assert!(!sim.flags().z && !sim.flags().cy && !sim.flags().ac);
        assert_eq!(sim.t_states(), 7 + 7 + 5);
    }

    #[test]
    fn ana_a_of_zero() {
        let sim = run("MVI A,0\nANA A\nHLT");
        let flags = sim.flags();
        assert!(flags.z && flags.p && !flags.cy && !flags.s);
    }

    #[test]
    fn conditional_jump_timing() {
        let taken = run("MVI A,0\nANA A\nJZ DONE\nNOP\nDONE: HLT");
        assert_eq!(taken.t_states(), 7 + 4 + 10 + 5);
        let not_taken = run("MVI A,1\nANA A\nJZ DONE\nNOP\nDONE: HLT");
        assert_eq!(not_taken.t_states(), 7 + 4 + 7 + 4 + 5);
    }

    #[test]
    fn push_then_pop() {
        let sim = run("LXI H,1234H\nPUSH H\nPOP D\nHLT");
        let reg = sim.registers();
        assert_eq!((reg.d, reg.e), (0x12, 0x34));
        assert_eq!(reg.sp, 0xFFFF);
        assert_eq!(sim.memory(0xFFFE), 0x12);
        assert_eq!(sim.memory(0xFFFD), 0x34);
    }

    #[test]
    fn counting_loop_halts() {
        let sim = run("MVI A,00H\nLOOP: INR A\nCPI 05H\nJNZ LOOP\nHLT");
        assert_eq!(sim.registers().a, 0x05);
        assert!(sim.flags().z);
        assert_eq!(sim.pc(), 0x8008);
        assert!(sim.is_halted());
        assert_eq!(sim.last_source_line(), Some(5));
        assert_eq!(sim.source_line(sim.pc()), Some(5));
    }

    #[test]
    fn halt_reports_once() {
        let mut sim = sim("NOP\nHLT");
        assert!(sim.step().progressed());
        assert_eq!(sim.step(), StepOutcome::Executed);
        assert!(sim.is_halted());
        assert_eq!(sim.step(), StepOutcome::Halted);
        assert_eq!(sim.pc(), 0x8001);
    }

    #[test]
    fn unmapped_fetch_changes_nothing() {
        let mut sim = sim("MVI A,7\nJMP 9000H");
        sim.step();
        sim.step();
        let (reg, flags, t) = (sim.registers(), sim.flags(), sim.t_states());
        let outcome = sim.step();
        assert_eq!(
            outcome,
            StepOutcome::Fault(Fault {
                addr: 0x9000,
                byte: 0
            })
        );
        assert!(!outcome.progressed());
        assert_eq!(sim.registers(), reg);
        assert_eq!(sim.flags(), flags);
        assert_eq!(sim.t_states(), t);
        assert!(!sim.is_halted());
    }

    #[test]
    fn stray_hlt_byte_halts() {
        let mut sim = sim("JMP 9000H");
        sim.set_memory(0x9000, HLT_OPCODE);
        sim.step();
        assert_eq!(sim.step(), StepOutcome::Halted);
        assert!(sim.is_halted());
    }

    #[test]
    fn fault_stops_run() {
        let mut sim = sim("NOP\nJMP 0");
        let summary = sim.run();
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.stop, Stop::Fault(Fault { addr: 0, byte: 0 }));
    }

    #[test]
    fn step_limit() {
        let mut sim = Simulator::new(Options {
            max_steps: 100,
            ..Options::default()
        });
        sim.assemble("SPIN: JMP SPIN").unwrap();
        let summary = sim.run();
        assert_eq!(summary.stop, Stop::StepLimit);
        assert_eq!(summary.steps, 100);
        assert_eq!(sim.t_states(), 1000);
        assert!(!sim.is_halted());
    }

    #[test]
    fn decimal_adjust() {
        let sim = run("MVI A,38H\nADI 45H\nDAA\nHLT");
        assert_eq!(sim.registers().a, 0x83);
        assert!(!sim.flags().cy);

        let sim = run("MVI A,99H\nADI 01H\nDAA\nHLT");
        assert_eq!(sim.registers().a, 0x00);
        assert!(sim.flags().cy && sim.flags().z);
    }

    #[test]
    fn subtraction_borrows() {
        let sim = run("MVI A,5\nSUI 6\nHLT");
        assert_eq!(sim.registers().a, 0xFF);
        assert!(sim.flags().cy && sim.flags().s && !sim.flags().z);

        let sim = run("MVI A,5\nCPI 5\nHLT");
        assert_eq!(sim.registers().a, 5);
        assert!(sim.flags().z && !sim.flags().cy);

        let sim = run("STC\nMVI A,10H\nSBI 0FH\nHLT");
        assert_eq!(sim.registers().a, 0x00);
        assert!(sim.flags().z && !sim.flags().cy);
    }

    #[test]
    fn increment_keeps_carry() {
        let sim = run("STC\nMVI B,0FFH\nINR B\nHLT");
        assert_eq!(sim.registers().b, 0);
        assert!(sim.flags().z && sim.flags().cy && sim.flags().ac);
    }

    #[test]
    fn psw_round_trip() {
        let sim = run("MVI A,0FFH\nADI 1\nPUSH PSW\nPOP B\nHLT");
        let reg = sim.registers();
        assert_eq!(reg.b, 0x00);
        assert_eq!(reg.c, 0b0101_0111);

        let sim = run("LXI B,0C3C1H\nPUSH B\nPOP PSW\nHLT");
        assert_eq!(sim.registers().a, 0xC3);
        let flags = sim.flags();
        assert!(flags.s && flags.z && !flags.ac && !flags.p && flags.cy);
    }

    #[test]
    fn call_and_return() {
        let sim = run("CALL SUB\nHLT\nSUB: MVI A,7\nRET");
        assert_eq!(sim.registers().a, 7);
        assert_eq!(sim.pc(), 0x8003);
        assert_eq!(sim.registers().sp, 0xFFFF);
        assert_eq!(sim.t_states(), 18 + 7 + 10 + 5);
    }

    #[test]
    fn conditional_return_timing() {
        let sim = run("CALL SUB\nHLT\nSUB: XRA A\nRNZ\nRZ");
        assert_eq!(sim.t_states(), 18 + 4 + 6 + 12 + 5);
    }

    #[test]
    fn restart_vector() {
        let mut sim = sim("NOP\nRST 1");
        sim.step();
        sim.step();
        assert_eq!(sim.pc(), 0x0008);
        assert_eq!(sim.memory(sim.registers().sp), 0x02);
        assert_eq!(sim.memory(sim.registers().sp + 1), 0x80);
    }

    #[test]
    fn exchange_with_stack_top() {
        let sim = run("LXI H,1234H\nPUSH H\nLXI H,5678H\nXTHL\nHLT");
        assert_eq!(sim.registers().hl(), 0x1234);
        assert_eq!(sim.memory(0xFFFD), 0x78);
        assert_eq!(sim.memory(0xFFFE), 0x56);
    }

    #[test]
    fn sixteen_bit_arithmetic() {
        let sim = run("LXI H,0FFFFH\nLXI B,1\nDAD B\nHLT");
        assert_eq!(sim.registers().hl(), 0);
        assert!(sim.flags().cy);

        let sim = run("LXI D,0FFFFH\nINX D\nDCX B\nHLT");
        assert_eq!(sim.registers().de(), 0);
        assert_eq!(sim.registers().bc(), 0xFFFF);
        assert!(!sim.flags().z);
    }

    #[test]
    fn rotates_through_carry() {
        let sim = run("MVI A,81H\nRLC\nHLT");
        assert_eq!(sim.registers().a, 0x03);
        assert!(sim.flags().cy);

        let sim = run("MVI A,01H\nRAR\nRAR\nHLT");
        assert_eq!(sim.registers().a, 0x80);
        assert!(!sim.flags().cy);
    }

    #[test]
    fn memory_operands_use_hl() {
        let sim = run("LXI H,2050H\nMVI M,42H\nINR M\nMOV B,M\nSTA 2051H\nLHLD 2050H\nHLT");
        assert_eq!(sim.memory(0x2050), 0x43);
        assert_eq!(sim.registers().b, 0x43);
        assert_eq!(sim.registers().hl(), 0x43);
    }

    #[test]
    fn memory_patches_are_visible() {
        let mut sim = sim("LDA 9000H\nHLT");
        sim.set_memory(0x9000, 0x42);
        sim.run();
        assert_eq!(sim.registers().a, 0x42);
    }

    #[test]
    fn assemble_keeps_memory_and_registers() {
        let mut sim = run("MVI A,9\nSTA 9000H\nHLT");
        let report = sim.assemble("NOP\nHLT").unwrap();
        assert!(report.success);
        assert_eq!(report.instructions, 2);
        assert_eq!(report.message, "Assembled 2 instructions to 8000H");
        assert!(!sim.is_halted());
        assert_eq!(sim.pc(), 0x8000);
        assert_eq!(sim.memory(0x9000), 9);
        assert_eq!(sim.registers().a, 9);
        assert!(sim.program().labels().is_empty());
    }

    #[test]
    fn empty_source_is_reported() {
        let mut sim = Simulator::default();
        let report = sim.assemble("; nothing\n\n").unwrap();
        assert!(!report.success);
        assert_eq!(report.instructions, 0);
        assert_eq!(sim.pc(), 0);
    }

    #[test]
    fn warnings_are_counted() {
        let mut sim = Simulator::default();
        let report = sim.assemble("FOO\nNOP").unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.message.ends_with("(1 warning)"));
    }

    #[test]
    fn strict_assembly_clears_program() {
        let mut sim = Simulator::new(Options {
            strictness: Strictness::all(),
            ..Options::default()
        });
        sim.assemble("NOP").unwrap();
        assert!(sim.assemble("NOP\nFOO").is_err());
        assert!(sim.program().is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut sim = run("MVI A,9\nSTA 9000H\nHLT");
        sim.reset();
        assert_eq!(sim.registers(), Registers::default());
        assert_eq!(sim.flags(), Flags::default());
        assert_eq!(sim.memory(0x9000), 0);
        assert_eq!(sim.memory(0x8000), 0);
        assert_eq!(sim.t_states(), 0);
        assert!(!sim.is_halted());
        assert!(sim.program().is_empty());
    }

    #[test]
    fn slow_run_ticks() {
        let mut slow = sim("NOP\nNOP\nHLT");
        assert_eq!(slow.tick(), Tick::Continue);
        assert_eq!(slow.tick(), Tick::Continue);
        assert_eq!(slow.tick(), Tick::Halted { executed: true });
        assert_eq!(slow.tick(), Tick::Halted { executed: false });

        // A stray HLT byte halts without running anything
        let mut stray = sim("JMP 9000H");
        stray.set_memory(0x9000, HLT_OPCODE);
        assert_eq!(stray.tick(), Tick::Continue);
        assert_eq!(stray.tick(), Tick::Halted { executed: false });

        let mut spin = sim("SPIN: JMP SPIN");
        assert_eq!(spin.tick(), Tick::Continue);
        spin.stop();
        assert_eq!(spin.tick(), Tick::Stopped);
        assert!(spin.is_halted());
    }

    #[test]
    fn conditional_call() {
        let mut sim = sim("XRA A\nCNZ SUB\nCZ SUB\nHLT\nSUB: RET");
        sim.step();
        sim.step();
        assert_eq!(sim.pc(), 0x8004);
        assert_eq!(sim.registers().sp, 0xFFFF);
        assert_eq!(sim.t_states(), 4 + 9);

        sim.step();
        assert_eq!(sim.pc(), 0x8008);
        assert_eq!(sim.registers().sp, 0xFFFD);
        assert_eq!(sim.memory(0xFFFD), 0x07);
        assert_eq!(sim.memory(0xFFFE), 0x80);
        assert_eq!(sim.t_states(), 4 + 9 + 18);

        assert_eq!(sim.run().stop, Stop::Halted);
        assert_eq!(sim.pc(), 0x8007);
        assert_eq!(sim.t_states(), 4 + 9 + 18 + 10 + 5);
    }

    #[test]
    fn sign_and_parity_conditions() {
        let src = "\
            MVI A,80H
            ORA A
            JP FAIL
            JM NEXT
    FAIL:   HLT
    NEXT:   MVI A,03H
            ORA A
            JPO FAIL
            JPE DONE
            HLT
    DONE:   MVI B,1
            HLT";
        let sim = run(src);
        assert_eq!(sim.registers().b, 1);
        assert_eq!(sim.pc(), 0x8016);
    }

    #[test]
    fn stack_pointer_wraps() {
        let sim = run("INX SP\nHLT");
        assert_eq!(sim.registers().sp, 0x0000);

        let sim = run("LXI SP,0\nDCX SP\nHLT");
        assert_eq!(sim.registers().sp, 0xFFFF);
    }

    #[test]
    fn logical_ops_clear_auxiliary_carry() {
        let mut sim = sim("MVI A,0FH\nADI 01H\nANA A\nHLT");
        sim.step();
        sim.step();
        assert!(sim.flags().ac);
        sim.step();
        assert!(!sim.flags().ac && !sim.flags().cy);
        assert_eq!(sim.registers().a, 0x10);
    }

    #[test]
    fn exchanges_and_pointers() {
        let sim = run("LXI H,1234H\nLXI D,5678H\nXCHG\nHLT");
        assert_eq!(sim.registers().hl(), 0x5678);
        assert_eq!(sim.registers().de(), 0x1234);

        let src = "\
            LXI H,1234H
            LXI D,5678H
            XCHG
            SHLD 9000H
            LXI B,9001H
            LDAX B
            LXI D,9005H
            STAX D
            LXI H,2000H
            SPHL
            LXI H,TARGET
            PCHL
            HLT
    TARGET: HLT";
        let sim = run(src);
        assert_eq!(sim.memory(0x9000), 0x78);
        assert_eq!(sim.memory(0x9001), 0x56);
        assert_eq!(sim.memory(0x9005), 0x56);
        assert_eq!(sim.registers().a, 0x56);
        assert_eq!(sim.registers().sp, 0x2000);
        assert_eq!(Some(&sim.pc()), sim.program().labels().get("TARGET"));
    }

    #[test]
    fn carry_in() {
        let sim = run("STC\nMVI A,10H\nACI 05H\nHLT");
        assert_eq!(sim.registers().a, 0x16);
        assert!(!sim.flags().cy);

        let sim = run("STC\nMVI A,0FFH\nMVI B,00H\nADC B\nHLT");
        assert_eq!(sim.registers().a, 0x00);
        assert!(sim.flags().cy && sim.flags().z && sim.flags().ac);

        let sim = run("STC\nMVI A,10H\nMVI B,05H\nSBB B\nHLT");
        assert_eq!(sim.registers().a, 0x0A);
        assert!(!sim.flags().cy);

        let sim = run("STC\nMVI A,00H\nSBI 00H\nHLT");
        assert_eq!(sim.registers().a, 0xFF);
        assert!(sim.flags().cy && sim.flags().s);
    }

    #[test]
    fn logical_and_complement() {
        let sim = run("MVI A,0F0H\nMVI B,0FH\nORA B\nHLT");
        assert_eq!(sim.registers().a, 0xFF);
        assert!(sim.flags().s && sim.flags().p && !sim.flags().cy);

        let sim = run("MVI A,0FFH\nXRI 0FH\nHLT");
        assert_eq!(sim.registers().a, 0xF0);

        let sim = run("MVI A,55H\nXRA A\nHLT");
        assert_eq!(sim.registers().a, 0x00);
        assert!(sim.flags().z);

        let sim = run("MVI A,50H\nORI 05H\nCMA\nHLT");
        assert_eq!(sim.registers().a, 0xAA);

        let sim = run("STC\nCMC\nHLT");
        assert!(!sim.flags().cy);
        let sim = run("CMC\nHLT");
        assert!(sim.flags().cy);
    }

    #[test]
    fn plain_rotates() {
        let sim = run("MVI A,01H\nRRC\nHLT");
        assert_eq!(sim.registers().a, 0x80);
        assert!(sim.flags().cy);

        let sim = run("STC\nMVI A,80H\nRAL\nHLT");
        assert_eq!(sim.registers().a, 0x01);
        assert!(sim.flags().cy);
    }

    #[test]
    fn io_and_interrupt_control_do_nothing() {
        let sim = run("MVI A,42H\nOUT 10H\nIN 20H\nEI\nDI\nRIM\nSIM\nHLT");
        assert_eq!(sim.registers().a, 0x42);
        assert_eq!(sim.flags(), Flags::default());
        assert_eq!(sim.pc(), 0x800A);
        assert_eq!(sim.t_states(), 7 + 10 + 10 + 4 * 4 + 5);
    }
}
