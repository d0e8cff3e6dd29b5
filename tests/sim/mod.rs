//! A small interpreter for the instruction stream `ttkcc` emits, used by the
//! end-to-end tests to actually run a compiled program instead of just
//! pattern-matching on the rendered assembly text.
//!
//! This is not a general TTK-91 simulator: it walks `Instruction` values
//! directly (no text parsing), has no I/O device error handling, and wraps
//! on arithmetic overflow rather than trapping.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use ttkcc::codegen::asm::{Device, Instruction, Operand, Reg};
use ttkcc::codegen::program::AssembledProgram;
use ttkcc::config::CompilerConfig;
use ttkcc::{compile_source, Diagnostic};

/// Function labels live in a disjoint address range from data/bss so that a
/// function pointer value (`ImmediateLabel` of a function name) never
/// aliases an ordinary object's address.
const CODE_ADDR_BASE: i32 = 1_000_000;
const STACK_TOP: i32 = 60_000;

pub struct Machine {
    mem: Vec<i32>,
    regs: [i32; 8],
    code: Vec<Instruction>,
    code_labels: HashMap<String, usize>,
    data_labels: HashMap<String, i32>,
    cc: Ordering,
    pc: usize,
    input: VecDeque<i32>,
    pub output: Vec<i32>,
    pub halted: bool,
    pub exit_code: i32,
}

impl Machine {
    #[must_use]
    pub fn new(program: &AssembledProgram, input: &[i32]) -> Self {
        let mut mem = vec![0i32; (STACK_TOP + 1) as usize];
        let mut data_labels = HashMap::new();
        let mut addr = 1;
        for item in &program.data {
            data_labels.insert(item.label.clone(), addr);
            for (i, &w) in item.words.iter().enumerate() {
                mem[addr as usize + i] = w;
            }
            addr += item.words.len().max(1) as i32;
        }
        for item in &program.bss {
            data_labels.insert(item.label.clone(), addr);
            addr += item.size_words.max(1) as i32;
        }

        let mut code_labels = HashMap::new();
        for (i, ins) in program.code.iter().enumerate() {
            if let Instruction::Label(name) = ins {
                code_labels.insert(name.clone(), i);
            }
        }

        let mut regs = [0i32; 8];
        regs[Reg::SP as usize] = STACK_TOP;
        regs[Reg::FP as usize] = STACK_TOP;

        Machine {
            mem,
            regs,
            code: program.code.clone(),
            code_labels,
            data_labels,
            cc: Ordering::Equal,
            pc: 0,
            input: input.iter().copied().collect(),
            output: Vec::new(),
            halted: false,
            exit_code: 0,
        }
    }

    fn reg(&self, r: Reg) -> i32 {
        self.regs[r as usize]
    }

    fn set_reg(&mut self, r: Reg, v: i32) {
        self.regs[r as usize] = v;
    }

    fn addr_of(&self, name: &str) -> i32 {
        if let Some(&a) = self.data_labels.get(name) {
            return a;
        }
        if let Some(&i) = self.code_labels.get(name) {
            return CODE_ADDR_BASE + i as i32;
        }
        panic!("simulator: undefined label '{name}'");
    }

    fn read(&self, op: &Operand) -> i32 {
        match op {
            Operand::Immediate(n) => *n,
            Operand::Mem { base, offset } => self.mem[(self.reg(*base) + offset) as usize],
            Operand::Reg(r) => self.reg(*r),
            Operand::Label(name) => self.mem[self.addr_of(name) as usize],
            Operand::ImmediateLabel(name) => self.addr_of(name),
        }
    }

    fn write(&mut self, op: &Operand, val: i32) {
        match op {
            Operand::Mem { base, offset } => {
                let a = (self.reg(*base) + offset) as usize;
                self.mem[a] = val;
            }
            Operand::Label(name) => {
                let a = self.addr_of(name) as usize;
                self.mem[a] = val;
            }
            _ => panic!("simulator: cannot store to {op:?}"),
        }
    }

    fn push(&mut self, v: i32) {
        let sp = self.reg(Reg::SP) - 1;
        self.set_reg(Reg::SP, sp);
        self.mem[sp as usize] = v;
    }

    fn pop(&mut self) -> i32 {
        let sp = self.reg(Reg::SP);
        let v = self.mem[sp as usize];
        self.set_reg(Reg::SP, sp + 1);
        v
    }

    /// Runs until `Halt`, returning the exit code. Panics on an obviously
    /// runaway program (no halt inside a generous step budget) so a broken
    /// test fails fast instead of hanging.
    pub fn run(&mut self) -> i32 {
        let mut steps = 0u64;
        while !self.halted {
            steps += 1;
            if steps > 2_000_000 {
                panic!("simulator: exceeded step budget without halting");
            }
            self.step();
        }
        self.exit_code
    }

    fn jump_if(&mut self, label: &str, cond: bool) {
        if cond {
            self.pc = self.code_labels[label];
        }
    }

    fn step(&mut self) {
        let ins = self.code[self.pc].clone();
        let mut next_pc = self.pc + 1;

        match &ins {
            Instruction::Label(_) | Instruction::Nop => {}
            Instruction::Load(r, o) => self.set_reg(*r, self.read(o)),
            Instruction::Store(r, o) => {
                let v = self.reg(*r);
                self.write(o, v);
            }
            Instruction::Add(r, o) => {
                let v = self.reg(*r).wrapping_add(self.read(o));
                self.set_reg(*r, v);
            }
            Instruction::Sub(r, o) => {
                let v = self.reg(*r).wrapping_sub(self.read(o));
                self.set_reg(*r, v);
            }
            Instruction::Mul(r, o) => {
                let v = self.reg(*r).wrapping_mul(self.read(o));
                self.set_reg(*r, v);
            }
            Instruction::Div(r, o) => {
                let rhs = self.read(o);
                let v = if rhs == 0 { 0 } else { self.reg(*r).wrapping_div(rhs) };
                self.set_reg(*r, v);
            }
            Instruction::Mod(r, o) => {
                let rhs = self.read(o);
                let v = if rhs == 0 { 0 } else { self.reg(*r).wrapping_rem(rhs) };
                self.set_reg(*r, v);
            }
            Instruction::And(r, o) => self.set_reg(*r, self.reg(*r) & self.read(o)),
            Instruction::Or(r, o) => self.set_reg(*r, self.reg(*r) | self.read(o)),
            Instruction::Xor(r, o) => self.set_reg(*r, self.reg(*r) ^ self.read(o)),
            Instruction::Shl(r, o) => self.set_reg(*r, self.reg(*r).wrapping_shl(self.read(o) as u32)),
            Instruction::Shr(r, o) => {
                let v = (self.reg(*r) as u32).wrapping_shr(self.read(o) as u32) as i32;
                self.set_reg(*r, v);
            }
            Instruction::Shra(r, o) => self.set_reg(*r, self.reg(*r).wrapping_shr(self.read(o) as u32)),
            Instruction::Not(r) => self.set_reg(*r, !self.reg(*r)),
            Instruction::Comp(r, o) => {
                self.cc = self.reg(*r).cmp(&self.read(o));
            }
            Instruction::Jump(l) => next_pc = self.code_labels[l],
            Instruction::JumpEq(l) => self.jump_if(l, self.cc == Ordering::Equal),
            Instruction::JumpNe(l) => self.jump_if(l, self.cc != Ordering::Equal),
            Instruction::JumpLt(l) => self.jump_if(l, self.cc == Ordering::Less),
            Instruction::JumpLe(l) => self.jump_if(l, self.cc != Ordering::Greater),
            Instruction::JumpGt(l) => self.jump_if(l, self.cc == Ordering::Greater),
            Instruction::JumpGe(l) => self.jump_if(l, self.cc != Ordering::Less),
            Instruction::JumpZero(l) => self.jump_if(l, self.cc == Ordering::Equal),
            Instruction::JumpNeg(l) => self.jump_if(l, self.cc == Ordering::Less),
            Instruction::Push(r) => {
                let v = self.reg(*r);
                self.push(v);
            }
            Instruction::Pop(r) => {
                let v = self.pop();
                self.set_reg(*r, v);
            }
            Instruction::Call(o) => {
                let target = match o {
                    Operand::Label(name) => self.code_labels[name],
                    Operand::Reg(r) => {
                        let v = self.reg(*r);
                        (v - CODE_ADDR_BASE) as usize
                    }
                    other => panic!("simulator: unsupported call target {other:?}"),
                };
                self.push(next_pc as i32);
                next_pc = target;
            }
            Instruction::Ret => next_pc = self.pop() as usize,
            Instruction::In(r, Device::Stdin) => {
                let v = self.input.pop_front().unwrap_or(0);
                self.set_reg(*r, v);
            }
            Instruction::In(r, Device::Stdout) => unreachable!("IN on stdout: {r:?}"),
            Instruction::Out(r, Device::Stdout) => self.output.push(self.reg(*r)),
            Instruction::Out(r, Device::Stdin) => unreachable!("OUT on stdin: {r:?}"),
            Instruction::Halt => {
                self.exit_code = self.reg(Reg::R1);
                self.halted = true;
            }
        }

        if !self.halted {
            self.pc = next_pc;
        }
    }
}

/// Compiles `source` and runs it to completion, feeding `input` to `in()`
/// calls in order and collecting every `out()` argument in order.
pub fn run(source: &str, input: &[i32]) -> (Vec<i32>, i32) {
    let config = CompilerConfig::default();
    let program = compile_source(source, &config).unwrap_or_else(|diags| panic!("{}", render_diags(&diags)));
    let mut machine = Machine::new(&program, input);
    let exit_code = machine.run();
    (machine.output, exit_code)
}

fn render_diags(diags: &[Diagnostic]) -> String {
    diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
}
