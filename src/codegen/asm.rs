//! The target instruction set: a small TTK-91-flavored register machine.
//!
//! This is not a bit-exact rendition of real Titokone opcodes -- the project
//! only needs to preserve the *semantic shape* of such a machine (8 GPRs,
//! load/store, a downward-growing stack, `in`/`out` traps) -- but it keeps
//! the two-operand accumulator style (`ADD Rj, src` means `Rj += src`) and
//! condition-code-based branching real TTK-91 assembly uses.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Reg {
    /// Frame pointer.
    pub const FP: Reg = Reg::R6;
    /// Stack pointer.
    pub const SP: Reg = Reg::R7;
    /// Wired to zero; conventionally the "no base register" marker for
    /// absolute/`=value` addressing, mirroring real TTK-91.
    pub const ZERO: Reg = Reg::R0;
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reg::R0 => "R0",
            Reg::R1 => "R1",
            Reg::R2 => "R2",
            Reg::R3 => "R3",
            Reg::R4 => "R4",
            Reg::R5 => "R5",
            Reg::R6 => "R6",
            Reg::R7 => "R7",
        };
        write!(f, "{s}")
    }
}

/// An addressing mode operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `=n` -- the literal value `n`.
    Immediate(i32),
    /// `base(offset)` -- direct memory access (no index register).
    Mem { base: Reg, offset: i32 },
    /// A bare register operand (`ADD R1, R2`).
    Reg(Reg),
    /// Direct addressing through a symbol: `LOAD R1, x` loads the *value*
    /// stored at global/static `x`. Also used as a jump/call target.
    Label(String),
    /// Immediate addressing of a symbol's address: `LOAD R1, =x` loads the
    /// address of `x` itself (used to decay a global array/function to a
    /// pointer value, or to take `&global`).
    ImmediateLabel(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(n) => write!(f, "={n}"),
            Operand::Mem { base, offset: 0 } => write!(f, "@{base}"),
            Operand::Mem { base, offset } => write!(f, "{offset}({base})"),
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Label(l) => write!(f, "{l}"),
            Operand::ImmediateLabel(l) => write!(f, "={l}"),
        }
    }
}

/// I/O device numbers for `IN`/`OUT`, matching the spec's single stdin/
/// stdout device pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Stdin,
    Stdout,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Stdin => write!(f, "=0"),
            Device::Stdout => write!(f, "=1"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Label(String),
    Load(Reg, Operand),
    Store(Reg, Operand),
    Add(Reg, Operand),
    Sub(Reg, Operand),
    Mul(Reg, Operand),
    /// Signed division; the hardware trap on `unsigned`-shaped wraparound
    /// means unsigned division is instead lowered to a `Call` of `__udiv`.
    Div(Reg, Operand),
    Mod(Reg, Operand),
    And(Reg, Operand),
    Or(Reg, Operand),
    Xor(Reg, Operand),
    Shl(Reg, Operand),
    /// Logical shift right.
    Shr(Reg, Operand),
    /// Arithmetic shift right.
    Shra(Reg, Operand),
    Not(Reg),
    Comp(Reg, Operand),
    Jump(String),
    JumpEq(String),
    JumpNe(String),
    JumpLt(String),
    JumpLe(String),
    JumpGt(String),
    JumpGe(String),
    JumpZero(String),
    JumpNeg(String),
    Push(Reg),
    Pop(Reg),
    /// `Operand::Label` calls a known symbol directly; `Operand::Reg` calls
    /// through an address already computed into that register (needed for
    /// calls through function-pointer values).
    Call(Operand),
    Ret,
    In(Reg, Device),
    Out(Reg, Device),
    /// Halts the machine with the value in `R1` as the exit/out code; used
    /// only at the very end of `main`.
    Halt,
    Nop,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(l) => write!(f, "{l}:"),
            Instruction::Load(r, o) => write!(f, "    LOAD    {r}, {o}"),
            Instruction::Store(r, o) => write!(f, "    STORE   {r}, {o}"),
            Instruction::Add(r, o) => write!(f, "    ADD     {r}, {o}"),
            Instruction::Sub(r, o) => write!(f, "    SUB     {r}, {o}"),
            Instruction::Mul(r, o) => write!(f, "    MUL     {r}, {o}"),
            Instruction::Div(r, o) => write!(f, "    DIV     {r}, {o}"),
            Instruction::Mod(r, o) => write!(f, "    MOD     {r}, {o}"),
            Instruction::And(r, o) => write!(f, "    AND     {r}, {o}"),
            Instruction::Or(r, o) => write!(f, "    OR      {r}, {o}"),
            Instruction::Xor(r, o) => write!(f, "    XOR     {r}, {o}"),
            Instruction::Shl(r, o) => write!(f, "    SHL     {r}, {o}"),
            Instruction::Shr(r, o) => write!(f, "    SHR     {r}, {o}"),
            Instruction::Shra(r, o) => write!(f, "    SHRA    {r}, {o}"),
            Instruction::Not(r) => write!(f, "    NOT     {r}"),
            Instruction::Comp(r, o) => write!(f, "    COMP    {r}, {o}"),
            Instruction::Jump(l) => write!(f, "    JUMP    {l}"),
            Instruction::JumpEq(l) => write!(f, "    JEQU    {l}"),
            Instruction::JumpNe(l) => write!(f, "    JNEQU   {l}"),
            Instruction::JumpLt(l) => write!(f, "    JLES    {l}"),
            Instruction::JumpLe(l) => write!(f, "    JLES_   {l}"),
            Instruction::JumpGt(l) => write!(f, "    JGRE    {l}"),
            Instruction::JumpGe(l) => write!(f, "    JGRE_   {l}"),
            Instruction::JumpZero(l) => write!(f, "    JZER    {l}"),
            Instruction::JumpNeg(l) => write!(f, "    JNEG    {l}"),
            Instruction::Push(r) => write!(f, "    PUSH    SP, {r}"),
            Instruction::Pop(r) => write!(f, "    POP     SP, {r}"),
            Instruction::Call(o) => write!(f, "    CALL    SP, {o}"),
            Instruction::Ret => write!(f, "    EXIT    SP, 0"),
            Instruction::In(r, d) => write!(f, "    IN      {r}, {d}"),
            Instruction::Out(r, d) => write!(f, "    OUT     {r}, {d}"),
            Instruction::Halt => write!(f, "    SVC     SP, =HALT"),
            Instruction::Nop => write!(f, "    NOP"),
        }
    }
}
