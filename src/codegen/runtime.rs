//! Lowering for the three operations the hardware doesn't do natively:
//! `in`/`out` traps and the `__udiv` unsigned-division intrinsic.
//!
//! The stock machine's arithmetic traps on signed overflow (see the ISA
//! note in `spec`'s target description), so unsigned `/` and `%` cannot use
//! the hardware `DIV`: they call into a hand-written restoring binary
//! division routine emitted once per program by [`udiv_routine`].

use crate::codegen::asm::{Device, Instruction, Reg};
use crate::codegen::state::{ACC, ADDR, OPD};

pub const UDIV_LABEL: &str = "__udiv";

/// `in()` -- read one word from the input device into the accumulator.
#[must_use]
pub fn lower_in() -> Vec<Instruction> {
    vec![Instruction::In(ACC, Device::Stdin)]
}

/// `out(x)` assuming `x`'s value is already in the accumulator.
#[must_use]
pub fn lower_out() -> Vec<Instruction> {
    vec![Instruction::Out(ACC, Device::Stdout)]
}

/// Emits the `__udiv` subroutine: `dividend` at `2(FP)`, `divisor` at
/// `3(FP)` (the calling convention pushes arguments right-to-left, so the
/// first parameter lands closest to the return address). Leaves the
/// quotient in `R1` and, as a bonus the codegen's `%` lowering relies on,
/// the remainder in `R2` -- this is an internal intrinsic, not a
/// general-purpose call, so widening its contract costs nothing.
#[must_use]
pub fn udiv_routine() -> Vec<Instruction> {
    use Instruction::{
        And, Comp, Jump, JumpLt, Label, Load, Or, Pop, Push, Ret, Shl, Shr, Store, Sub, Xor,
    };
    use crate::codegen::asm::Operand::{self, Immediate, Mem, Reg as R};

    let dividend = Mem { base: Reg::FP, offset: 2 };
    let divisor = Mem { base: Reg::FP, offset: 3 };
    let quotient = Mem { base: Reg::FP, offset: -1 };
    let remainder = Mem { base: Reg::FP, offset: -2 };
    let i = Mem { base: Reg::FP, offset: -3 };
    let sign_bit = Immediate(i32::MIN);

    vec![
        Label(UDIV_LABEL.to_string()),
        Push(Reg::FP),
        Load(Reg::FP, R(Reg::SP)),
        Sub(Reg::SP, Immediate(3)),
        Load(ACC, Immediate(0)),
        Store(ACC, quotient.clone()),
        Load(ACC, Immediate(0)),
        Store(ACC, remainder.clone()),
        Load(ACC, Immediate(31)),
        Store(ACC, i.clone()),
        Label(format!("{UDIV_LABEL}_loop")),
        Load(ACC, i.clone()),
        Comp(ACC, Immediate(0)),
        JumpLt(format!("{UDIV_LABEL}_done")),
        Load(ACC, remainder.clone()),
        Shl(ACC, Immediate(1)),
        Load(OPD, dividend.clone()),
        Load(ADDR, i.clone()),
        Shr(OPD, R(ADDR)),
        And(OPD, Immediate(1)),
        Or(ACC, R(OPD)),
        Store(ACC, remainder.clone()),
        Load(ACC, remainder.clone()),
        Xor(ACC, sign_bit.clone()),
        Load(OPD, divisor.clone()),
        Xor(OPD, sign_bit.clone()),
        Comp(ACC, R(OPD)),
        JumpLt(format!("{UDIV_LABEL}_skip_sub")),
        Load(ACC, remainder.clone()),
        Load(OPD, divisor.clone()),
        Sub(ACC, R(OPD)),
        Store(ACC, remainder.clone()),
        Load(ACC, Immediate(1)),
        Load(OPD, i.clone()),
        Shl(ACC, R(OPD)),
        Load(OPD, quotient.clone()),
        Or(ACC, R(OPD)),
        Store(ACC, quotient.clone()),
        Label(format!("{UDIV_LABEL}_skip_sub")),
        Load(ACC, i.clone()),
        Sub(ACC, Immediate(1)),
        Store(ACC, i),
        Jump(format!("{UDIV_LABEL}_loop")),
        Label(format!("{UDIV_LABEL}_done")),
        Load(ACC, quotient),
        Load(OPD, remainder),
        Load(Reg::SP, R(Reg::FP)),
        Pop(Reg::FP),
        Ret,
    ]
}
