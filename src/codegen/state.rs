//! Per-function frame layout, scratch-register discipline, and the label
//! generator shared by expression and statement codegen.
//!
//! Register allocation deliberately has no liveness analysis: every
//! subexpression that needs to survive evaluating another subexpression is
//! pushed to the stack and popped back, never left live in a register
//! across a call or nested operator. This trades performance for a
//! correctness argument that holds regardless of expression depth or
//! side effects, which matters far more here than generated code quality.

use std::collections::HashMap;

use crate::codegen::asm::Reg;
use crate::sema::scope::ScopeStack;
use crate::types::Type;

/// Primary accumulator: the result of evaluating any expression ends up
/// here.
pub const ACC: Reg = Reg::R1;
/// Secondary operand register, used to hold a binary operator's
/// already-evaluated left-hand side while the right-hand side is computed
/// into `ACC`.
pub const OPD: Reg = Reg::R2;
/// Scratch register for address computation (array/pointer indexing,
/// assignment targets) so it never collides with `ACC`/`OPD`.
pub const ADDR: Reg = Reg::R3;
/// Extra scratch used by multi-step lowerings (`__udiv`'s shift loop,
/// argument marshalling).
pub const SCRATCH: Reg = Reg::R4;

#[derive(Debug, Clone)]
pub enum Storage {
    /// `FP`-relative local or parameter, offset in words.
    Local(i32),
    /// A named global (or file-scope static) accessed through its label.
    Global(String),
}

#[derive(Debug, Clone)]
pub struct VarInfo {
    pub ty: Type,
    pub storage: Storage,
}

pub struct LoopLabels {
    pub continue_label: String,
    pub break_label: String,
}

pub struct FuncState {
    pub vars: ScopeStack<VarInfo>,
    frame_words: u32,
    label_counter: u32,
    pub loop_stack: Vec<LoopLabels>,
    pub func_name: String,
    static_local_counters: HashMap<String, u32>,
}

impl FuncState {
    #[must_use]
    pub fn new(func_name: &str) -> Self {
        FuncState {
            vars: ScopeStack::new(),
            frame_words: 0,
            label_counter: 0,
            loop_stack: Vec::new(),
            func_name: func_name.to_string(),
            static_local_counters: HashMap::new(),
        }
    }

    /// Allocates a new local slot of `size_words` words, returning its
    /// (most negative) base offset from `FP`.
    pub fn alloc_local(&mut self, size_words: u32) -> i32 {
        self.frame_words += size_words;
        -(self.frame_words as i32)
    }

    #[must_use]
    pub fn frame_words(&self) -> u32 {
        self.frame_words
    }

    /// A fresh, function-unique label, e.g. `L_main_3`.
    pub fn fresh_label(&mut self, hint: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("L_{}_{hint}_{n}", self.func_name)
    }

    /// A unique data label for a `static` local named `name`, stable across
    /// calls (it names one persistent storage slot) but distinguished from
    /// any same-named local in a different function or scope depth.
    pub fn static_local_label(&mut self, name: &str) -> String {
        let n = self.static_local_counters.entry(name.to_string()).or_insert(0);
        let label = format!("{}.{}.{}", self.func_name, name, *n);
        *n += 1;
        label
    }
}
