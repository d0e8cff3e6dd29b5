//! Expression code generation: every node leaves its value in [`ACC`] and
//! returns that value's type. L-value addresses are computed separately
//! (see [`lvalue_addr`]) since only a handful of expression forms denote
//! one (identifiers, `*p`, `a[i]`).

use crate::ast::{AssignOp, BinOp, Expr, ExprKind, IncDec, UnOp};
use crate::codegen::asm::{Instruction, Operand, Reg};
use crate::codegen::runtime;
use crate::codegen::state::{FuncState, Storage, ACC, ADDR, OPD};
use crate::codegen::CodegenCtx;
use crate::diagnostics::{Diagnostic, Kind, Span};
use crate::sema::typeck;
use crate::types::Type;

type CResult<T> = Result<T, Diagnostic>;

/// Emits code for `e`, leaving its (possibly decayed) value in `ACC`.
pub fn compile_rvalue(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    e: &Expr,
) -> CResult<Type> {
    match &e.kind {
        ExprKind::IntLiteral { value, unsigned } => {
            out.push(Instruction::Load(ACC, Operand::Immediate(*value as i32)));
            Ok(if *unsigned { Type::unsigned() } else { Type::int() })
        }
        ExprKind::StringLiteral(data) => {
            let label = cx.intern_string(data);
            out.push(Instruction::Load(ACC, Operand::ImmediateLabel(label)));
            Ok(Type::pointer_to(Type::int()))
        }
        ExprKind::Ident(_) => {
            let ty = lvalue_addr(cx, fs, out, e)?;
            if ty.is_array() || ty.is_function() {
                // decay: the address we just computed *is* the value
                out.push(Instruction::Load(ACC, Operand::Reg(ADDR)));
                Ok(ty.decay())
            } else {
                out.push(Instruction::Load(ACC, Operand::Mem { base: ADDR, offset: 0 }));
                Ok(ty)
            }
        }
        ExprKind::Unary(UnOp::Deref, inner) => {
            let inner_ty = compile_rvalue(cx, fs, out, inner)?;
            let pointee = inner_ty
                .pointee()
                .cloned()
                .ok_or_else(|| type_error(e.span, "cannot dereference a non-pointer"))?;
            if pointee.is_function() {
                // a function has no storage to fetch: its rvalue is its own
                // address, which is exactly what's already in ACC.
                Ok(pointee.decay())
            } else if pointee.is_array() {
                Ok(pointee)
            } else {
                out.push(Instruction::Load(ACC, Operand::Mem { base: ACC, offset: 0 }));
                Ok(pointee)
            }
        }
        ExprKind::Unary(UnOp::Addr, inner) => {
            let pointee = lvalue_addr(cx, fs, out, inner)?;
            out.push(Instruction::Load(ACC, Operand::Reg(ADDR)));
            Ok(Type::pointer_to(pointee))
        }
        ExprKind::Unary(op, inner) => compile_unary_arith(cx, fs, out, *op, inner, e.span),
        ExprKind::IncDec(kind, operand) => compile_incdec(cx, fs, out, *kind, operand, e.span),
        ExprKind::Binary(BinOp::LogAnd, l, r) => compile_logical(cx, fs, out, true, l, r),
        ExprKind::Binary(BinOp::LogOr, l, r) => compile_logical(cx, fs, out, false, l, r),
        ExprKind::Binary(BinOp::Comma, l, r) => {
            compile_rvalue(cx, fs, out, l)?;
            compile_rvalue(cx, fs, out, r)
        }
        ExprKind::Binary(op, l, r) => compile_binary(cx, fs, out, *op, l, r, e.span),
        ExprKind::Assign(op, lhs, rhs) => compile_assign(cx, fs, out, *op, lhs, rhs, e.span),
        ExprKind::Conditional(c, t, f) => compile_conditional(cx, fs, out, c, t, f),
        ExprKind::Index(base, idx) => {
            let elem = index_lvalue(cx, fs, out, base, idx, e.span)?;
            if elem.is_array() {
                out.push(Instruction::Load(ACC, Operand::Reg(ADDR)));
                Ok(elem.decay())
            } else {
                out.push(Instruction::Load(ACC, Operand::Mem { base: ADDR, offset: 0 }));
                Ok(elem)
            }
        }
        ExprKind::Call(callee, args) => compile_call(cx, fs, out, callee, args, e.span),
        ExprKind::Sizeof(inner) => {
            let ty = expr_type(cx, fs, inner)?;
            out.push(Instruction::Load(ACC, Operand::Immediate(ty.size_bytes() as i32)));
            Ok(Type::unsigned())
        }
    }
}

/// Computes `e`'s address into [`ADDR`], returning the (un-decayed)
/// l-value type. Only identifiers, `*p`, and `a[i]` are valid l-values in
/// this subset; anything else is a codegen-stage type error (the parser
/// cannot reject it earlier since it doesn't track types).
pub fn lvalue_addr(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    e: &Expr,
) -> CResult<Type> {
    match &e.kind {
        ExprKind::Ident(name) => {
            let info = fs
                .vars
                .lookup(name)
                .cloned()
                .or_else(|| cx.global_var_info(name))
                .ok_or_else(|| {
                    Diagnostic::error(Kind::Undeclared, e.span, format!("use of undeclared identifier '{name}'"))
                })?;
            match &info.storage {
                Storage::Local(offset) => {
                    out.push(Instruction::Load(ADDR, Operand::Immediate(*offset)));
                    out.push(Instruction::Add(ADDR, Operand::Reg(Reg::FP)));
                }
                Storage::Global(label) => {
                    out.push(Instruction::Load(ADDR, Operand::ImmediateLabel(label.clone())));
                }
            }
            Ok(info.ty)
        }
        ExprKind::Unary(UnOp::Deref, inner) => {
            let inner_ty = compile_rvalue(cx, fs, out, inner)?;
            let pointee = inner_ty
                .pointee()
                .cloned()
                .ok_or_else(|| type_error(e.span, "cannot dereference a non-pointer"))?;
            out.push(Instruction::Load(ADDR, Operand::Reg(ACC)));
            Ok(pointee)
        }
        ExprKind::Index(base, idx) => index_lvalue(cx, fs, out, base, idx, e.span),
        _ => Err(type_error(e.span, "expression is not assignable")),
    }
}

/// Shared by `compile_rvalue`'s and `lvalue_addr`'s `a[i]` handling: `a[i]`
/// is always `*(a + i)`, whether `a` is an array (which decays to its own
/// address) or a pointer variable (whose value already is that address).
fn index_lvalue(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    base: &Expr,
    idx: &Expr,
    span: Span,
) -> CResult<Type> {
    let base_ty = compile_rvalue(cx, fs, out, base)?;
    let elem = base_ty
        .decay()
        .pointee()
        .cloned()
        .ok_or_else(|| type_error(span, "subscripted value is not an array or pointer"))?;
    out.push(Instruction::Push(ACC));
    compile_rvalue(cx, fs, out, idx)?;
    out.push(Instruction::Pop(OPD));
    let size = elem.size_words().max(1) as i32;
    if size != 1 {
        out.push(Instruction::Mul(ACC, Operand::Immediate(size)));
    }
    out.push(Instruction::Add(ACC, Operand::Reg(OPD)));
    out.push(Instruction::Load(ADDR, Operand::Reg(ACC)));
    Ok(elem)
}

fn compile_unary_arith(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    op: UnOp,
    inner: &Expr,
    _span: Span,
) -> CResult<Type> {
    let ty = compile_rvalue(cx, fs, out, inner)?;
    let ty = typeck::promote(&ty);
    match op {
        UnOp::Plus => Ok(ty),
        UnOp::Neg => {
            // 0 - x, which wraps exactly like signed/unsigned subtraction
            // elsewhere: no dedicated NEG opcode needed.
            out.push(Instruction::Load(OPD, Operand::Reg(ACC)));
            out.push(Instruction::Load(ACC, Operand::Immediate(0)));
            out.push(Instruction::Sub(ACC, Operand::Reg(OPD)));
            Ok(ty)
        }
        UnOp::BitNot => {
            out.push(Instruction::Not(ACC));
            Ok(ty)
        }
        UnOp::Not => {
            out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
            let zero_label = fs.fresh_label("lognot_zero");
            let end_label = fs.fresh_label("lognot_end");
            out.push(Instruction::JumpEq(zero_label.clone()));
            out.push(Instruction::Load(ACC, Operand::Immediate(0)));
            out.push(Instruction::Jump(end_label.clone()));
            out.push(Instruction::Label(zero_label));
            out.push(Instruction::Load(ACC, Operand::Immediate(1)));
            out.push(Instruction::Label(end_label));
            Ok(Type::int())
        }
        UnOp::Deref | UnOp::Addr => unreachable!("handled by the caller"),
    }
}

fn compile_incdec(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    kind: IncDec,
    operand: &Expr,
    span: Span,
) -> CResult<Type> {
    let ty = lvalue_addr(cx, fs, out, operand)?;
    out.push(Instruction::Push(ADDR));
    out.push(Instruction::Load(ACC, Operand::Mem { base: ADDR, offset: 0 }));
    let step = if ty.is_pointer() {
        ty.pointee().map(|p| p.size_words().max(1) as i32).unwrap_or(1)
    } else {
        1
    };
    let is_inc = matches!(kind, IncDec::PreInc | IncDec::PostInc);
    let is_post = matches!(kind, IncDec::PostInc | IncDec::PostDec);
    if is_post {
        out.push(Instruction::Load(OPD, Operand::Reg(ACC)));
    }
    if is_inc {
        out.push(Instruction::Add(ACC, Operand::Immediate(step)));
    } else {
        out.push(Instruction::Sub(ACC, Operand::Immediate(step)));
    }
    out.push(Instruction::Pop(ADDR));
    out.push(Instruction::Store(ACC, Operand::Mem { base: ADDR, offset: 0 }));
    if is_post {
        out.push(Instruction::Load(ACC, Operand::Reg(OPD)));
    }
    let _ = span;
    Ok(ty)
}

fn compile_logical(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    is_and: bool,
    l: &Expr,
    r: &Expr,
) -> CResult<Type> {
    compile_rvalue(cx, fs, out, l)?;
    out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
    let short_circuit = fs.fresh_label(if is_and { "and_false" } else { "or_true" });
    let end = fs.fresh_label("logical_end");
    let rhs_true = fs.fresh_label("rhs_true");
    if is_and {
        out.push(Instruction::JumpEq(short_circuit.clone()));
    } else {
        out.push(Instruction::JumpNe(short_circuit.clone()));
    }
    compile_rvalue(cx, fs, out, r)?;
    out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
    // normalize the (possibly non-0/1) truthy rhs value down to 0/1
    out.push(Instruction::JumpNe(rhs_true.clone()));
    out.push(Instruction::Load(ACC, Operand::Immediate(0)));
    out.push(Instruction::Jump(end.clone()));
    out.push(Instruction::Label(rhs_true));
    out.push(Instruction::Load(ACC, Operand::Immediate(1)));
    out.push(Instruction::Jump(end.clone()));
    out.push(Instruction::Label(short_circuit));
    out.push(Instruction::Load(ACC, Operand::Immediate(if is_and { 0 } else { 1 })));
    out.push(Instruction::Label(end));
    Ok(Type::int())
}

fn compile_binary(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    op: BinOp,
    l: &Expr,
    r: &Expr,
    span: Span,
) -> CResult<Type> {
    let lty = compile_rvalue(cx, fs, out, l)?;
    out.push(Instruction::Push(ACC));
    let rty = compile_rvalue(cx, fs, out, r)?;
    out.push(Instruction::Load(OPD, Operand::Reg(ACC)));
    out.push(Instruction::Pop(ACC));
    // ACC = lhs, OPD = rhs from here on.
    let result_ty = typeck::binary_result_type(
        op,
        &lty.decay(),
        &rty.decay(),
        typeck::is_null_pointer_constant(l),
        typeck::is_null_pointer_constant(r),
    )
    .map_err(|msg| Diagnostic::error(Kind::Type, span, msg))?;
    emit_scaled_pointer_arith(out, op, &lty, &rty, &result_ty);
    let unsigned = typeck::compares_unsigned(&lty.decay()) || typeck::compares_unsigned(&rty.decay());
    match op {
        BinOp::Add => out.push(Instruction::Add(ACC, Operand::Reg(OPD))),
        BinOp::Sub => {
            if lty.is_pointer() && rty.is_pointer() {
                out.push(Instruction::Sub(ACC, Operand::Reg(OPD)));
                let elem_size = lty.pointee().map(|p| p.size_words().max(1) as i32).unwrap_or(1);
                if elem_size != 1 {
                    out.push(Instruction::Div(ACC, Operand::Immediate(elem_size)));
                }
            } else {
                out.push(Instruction::Sub(ACC, Operand::Reg(OPD)));
            }
        }
        BinOp::Mul => out.push(Instruction::Mul(ACC, Operand::Reg(OPD))),
        BinOp::Div => emit_div_or_mod(cx, out, unsigned, false),
        BinOp::Mod => emit_div_or_mod(cx, out, unsigned, true),
        BinOp::BitAnd => out.push(Instruction::And(ACC, Operand::Reg(OPD))),
        BinOp::BitOr => out.push(Instruction::Or(ACC, Operand::Reg(OPD))),
        BinOp::BitXor => out.push(Instruction::Xor(ACC, Operand::Reg(OPD))),
        BinOp::Shl => out.push(Instruction::Shl(ACC, Operand::Reg(OPD))),
        BinOp::Shr => {
            if lty.is_unsigned_int() {
                out.push(Instruction::Shr(ACC, Operand::Reg(OPD)));
            } else {
                out.push(Instruction::Shra(ACC, Operand::Reg(OPD)));
            }
        }
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            emit_compare(out, fs, op, unsigned);
        }
        BinOp::LogAnd | BinOp::LogOr | BinOp::Comma => unreachable!("handled by caller"),
    }
    Ok(result_ty)
}

/// `p + n` / `n + p` / `p - n` scale the integer operand by the pointee
/// size before the add/sub happens; this rewrites `OPD` (the scalar side)
/// in place.
fn emit_scaled_pointer_arith(
    out: &mut Vec<Instruction>,
    op: BinOp,
    lty: &Type,
    rty: &Type,
    result_ty: &Type,
) {
    if !matches!(op, BinOp::Add | BinOp::Sub) || !result_ty.is_pointer() {
        return;
    }
    let (pointer_on_left, elem) = if lty.is_pointer() {
        (true, lty.pointee().cloned())
    } else {
        (false, rty.pointee().cloned())
    };
    let Some(elem) = elem else { return };
    let size = elem.size_words().max(1) as i32;
    if size == 1 {
        return;
    }
    if pointer_on_left {
        out.push(Instruction::Mul(OPD, Operand::Immediate(size)));
    } else {
        out.push(Instruction::Mul(ACC, Operand::Immediate(size)));
    }
}

fn emit_div_or_mod(cx: &mut CodegenCtx, out: &mut Vec<Instruction>, unsigned: bool, want_mod: bool) {
    if unsigned {
        cx.require_udiv();
        // __udiv(dividend=ACC, divisor=OPD): pushed right-to-left so the
        // dividend (the first parameter) lands closest to the return
        // address, per the calling convention in `runtime::udiv_routine`.
        out.push(Instruction::Push(OPD));
        out.push(Instruction::Push(ACC));
        out.push(Instruction::Call(Operand::Label(runtime::UDIV_LABEL.to_string())));
        out.push(Instruction::Add(Reg::SP, Operand::Immediate(2)));
        if want_mod {
            out.push(Instruction::Load(ACC, Operand::Reg(OPD)));
        }
    } else if want_mod {
        out.push(Instruction::Mod(ACC, Operand::Reg(OPD)));
    } else {
        out.push(Instruction::Div(ACC, Operand::Reg(OPD)));
    }
}

fn emit_compare(out: &mut Vec<Instruction>, fs: &mut FuncState, op: BinOp, unsigned: bool) {
    if unsigned {
        let bias = Operand::Immediate(i32::MIN);
        out.push(Instruction::Xor(ACC, bias.clone()));
        out.push(Instruction::Xor(OPD, bias));
    }
    out.push(Instruction::Comp(ACC, Operand::Reg(OPD)));
    let true_label = fs.fresh_label("cmp_true");
    let end_label = fs.fresh_label("cmp_end");
    let jump = match op {
        BinOp::Eq => Instruction::JumpEq(true_label.clone()),
        BinOp::Ne => Instruction::JumpNe(true_label.clone()),
        BinOp::Lt => Instruction::JumpLt(true_label.clone()),
        BinOp::Le => Instruction::JumpLe(true_label.clone()),
        BinOp::Gt => Instruction::JumpGt(true_label.clone()),
        BinOp::Ge => Instruction::JumpGe(true_label.clone()),
        _ => unreachable!(),
    };
    out.push(jump);
    out.push(Instruction::Load(ACC, Operand::Immediate(0)));
    out.push(Instruction::Jump(end_label.clone()));
    out.push(Instruction::Label(true_label));
    out.push(Instruction::Load(ACC, Operand::Immediate(1)));
    out.push(Instruction::Label(end_label));
}

fn compile_assign(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    op: AssignOp,
    lhs: &Expr,
    rhs: &Expr,
    span: Span,
) -> CResult<Type> {
    match op {
        AssignOp::Plain => {
            let lty = lvalue_addr(cx, fs, out, lhs)?;
            out.push(Instruction::Push(ADDR));
            compile_rvalue(cx, fs, out, rhs)?;
            out.push(Instruction::Pop(ADDR));
            out.push(Instruction::Store(ACC, Operand::Mem { base: ADDR, offset: 0 }));
            Ok(lty)
        }
        AssignOp::Compound(op) => {
            let lty = lvalue_addr(cx, fs, out, lhs)?;
            out.push(Instruction::Push(ADDR));
            out.push(Instruction::Load(ACC, Operand::Mem { base: ADDR, offset: 0 }));
            out.push(Instruction::Push(ACC));
            let rty = compile_rvalue(cx, fs, out, rhs)?;
            out.push(Instruction::Load(OPD, Operand::Reg(ACC)));
            out.push(Instruction::Pop(ACC));
            let result_ty = typeck::binary_result_type(
                op,
                &lty.decay(),
                &rty.decay(),
                typeck::is_null_pointer_constant(lhs),
                typeck::is_null_pointer_constant(rhs),
            )
            .map_err(|msg| Diagnostic::error(Kind::Type, span, msg))?;
            emit_scaled_pointer_arith(out, op, &lty, &rty, &result_ty);
            let unsigned = typeck::compares_unsigned(&lty.decay());
            match op {
                BinOp::Add => out.push(Instruction::Add(ACC, Operand::Reg(OPD))),
                BinOp::Sub => out.push(Instruction::Sub(ACC, Operand::Reg(OPD))),
                BinOp::Mul => out.push(Instruction::Mul(ACC, Operand::Reg(OPD))),
                BinOp::Div => emit_div_or_mod(cx, out, unsigned, false),
                BinOp::Mod => emit_div_or_mod(cx, out, unsigned, true),
                BinOp::BitAnd => out.push(Instruction::And(ACC, Operand::Reg(OPD))),
                BinOp::BitOr => out.push(Instruction::Or(ACC, Operand::Reg(OPD))),
                BinOp::BitXor => out.push(Instruction::Xor(ACC, Operand::Reg(OPD))),
                BinOp::Shl => out.push(Instruction::Shl(ACC, Operand::Reg(OPD))),
                BinOp::Shr => {
                    if lty.is_unsigned_int() {
                        out.push(Instruction::Shr(ACC, Operand::Reg(OPD)));
                    } else {
                        out.push(Instruction::Shra(ACC, Operand::Reg(OPD)));
                    }
                }
                _ => unreachable!("not a compound-assignment operator"),
            }
            out.push(Instruction::Pop(ADDR));
            out.push(Instruction::Store(ACC, Operand::Mem { base: ADDR, offset: 0 }));
            Ok(lty)
        }
    }
}

fn compile_conditional(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    c: &Expr,
    t: &Expr,
    f: &Expr,
) -> CResult<Type> {
    compile_rvalue(cx, fs, out, c)?;
    out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
    let else_label = fs.fresh_label("cond_else");
    let end_label = fs.fresh_label("cond_end");
    out.push(Instruction::JumpEq(else_label.clone()));
    let tty = compile_rvalue(cx, fs, out, t)?;
    out.push(Instruction::Jump(end_label.clone()));
    out.push(Instruction::Label(else_label));
    let fty = compile_rvalue(cx, fs, out, f)?;
    out.push(Instruction::Label(end_label));
    Ok(if tty.is_pointer() { tty } else { typeck::usual_arith_conversions(&tty, &fty) })
}

/// `in`/`out`/`__udiv` are "externally defined functions" per the runtime
/// intrinsics section: the front-end never requires a declaration for them
/// and lowers a direct call by name straight to the trap/subroutine instead
/// of a generic `CALL` through a looked-up function type.
fn compile_intrinsic_call(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    name: &str,
    args: &[Expr],
    span: Span,
) -> CResult<Option<Type>> {
    match name {
        "in" if args.is_empty() => {
            out.extend(runtime::lower_in());
            Ok(Some(Type::int()))
        }
        "out" if args.len() == 1 => {
            compile_rvalue(cx, fs, out, &args[0])?;
            out.extend(runtime::lower_out());
            Ok(Some(Type::Void))
        }
        "__udiv" if args.len() == 2 => {
            cx.require_udiv();
            // dividend (args[0]) must land at FP+2, divisor (args[1]) at
            // FP+3, so the divisor is pushed first (see `runtime::udiv_routine`).
            compile_rvalue(cx, fs, out, &args[1])?;
            out.push(Instruction::Push(ACC));
            compile_rvalue(cx, fs, out, &args[0])?;
            out.push(Instruction::Push(ACC));
            out.push(Instruction::Call(Operand::Label(runtime::UDIV_LABEL.to_string())));
            out.push(Instruction::Add(Reg::SP, Operand::Immediate(2)));
            Ok(Some(Type::unsigned()))
        }
        "in" | "out" | "__udiv" => Err(type_error(span, &format!("wrong number of arguments to '{name}'"))),
        _ => Ok(None),
    }
}

fn compile_call(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    callee: &Expr,
    args: &[Expr],
    span: Span,
) -> CResult<Type> {
    if let ExprKind::Ident(name) = &callee.kind {
        if fs.vars.lookup(name).is_none() && cx.global_var_info(name).is_none() {
            if let Some(ty) = compile_intrinsic_call(cx, fs, out, name, args, span)? {
                return Ok(ty);
            }
        }
    }
    for arg in args.iter().rev() {
        compile_rvalue(cx, fs, out, arg)?;
        out.push(Instruction::Push(ACC));
    }
    let callee_ty = compile_rvalue(cx, fs, out, callee)?;
    let func_ty = callee_ty
        .pointee()
        .cloned()
        .filter(Type::is_function)
        .ok_or_else(|| type_error(span, "called object is not a function or function pointer"))?;
    out.push(Instruction::Call(Operand::Reg(ACC)));
    if !args.is_empty() {
        out.push(Instruction::Add(Reg::SP, Operand::Immediate(args.len() as i32)));
    }
    let Type::Function { ret, .. } = func_ty else { unreachable!() };
    Ok((*ret).clone())
}

/// Computes an expression's type without emitting any code, for contexts
/// (`sizeof`) that never evaluate their operand.
pub fn expr_type(cx: &mut CodegenCtx, fs: &FuncState, e: &Expr) -> CResult<Type> {
    match &e.kind {
        ExprKind::IntLiteral { unsigned, .. } => {
            Ok(if *unsigned { Type::unsigned() } else { Type::int() })
        }
        ExprKind::StringLiteral(_) => Ok(Type::pointer_to(Type::int())),
        ExprKind::Ident(name) => fs
            .vars
            .lookup(name)
            .map(|v| v.ty.clone())
            .or_else(|| cx.global_var_info(name).map(|v| v.ty))
            .ok_or_else(|| {
                Diagnostic::error(Kind::Undeclared, e.span, format!("use of undeclared identifier '{name}'"))
            }),
        ExprKind::Unary(UnOp::Deref, inner) => expr_type(cx, fs, inner)?
            .decay()
            .pointee()
            .cloned()
            .ok_or_else(|| type_error(e.span, "cannot dereference a non-pointer")),
        ExprKind::Unary(UnOp::Addr, inner) => {
            Ok(Type::pointer_to(expr_type(cx, fs, inner)?))
        }
        ExprKind::Unary(crate::ast::UnOp::Not, _) => Ok(Type::int()),
        ExprKind::Sizeof(_) => Ok(Type::unsigned()),
        ExprKind::Unary(_, inner) | ExprKind::IncDec(_, inner) => expr_type(cx, fs, inner),
        ExprKind::Index(base, _) => expr_type(cx, fs, base)?
            .decay()
            .pointee()
            .cloned()
            .ok_or_else(|| type_error(e.span, "subscripted value is not an array or pointer")),
        ExprKind::Binary(BinOp::Comma, _, r) => expr_type(cx, fs, r),
        ExprKind::Binary(op, l, r) => {
            let lty = expr_type(cx, fs, l)?.decay();
            let rty = expr_type(cx, fs, r)?.decay();
            typeck::binary_result_type(
                *op,
                &lty,
                &rty,
                typeck::is_null_pointer_constant(l),
                typeck::is_null_pointer_constant(r),
            )
            .map_err(|m| type_error(e.span, &m))
        }
        ExprKind::Assign(_, l, _) => expr_type(cx, fs, l),
        ExprKind::Conditional(_, t, _) => expr_type(cx, fs, t),
        ExprKind::Call(callee, _) => {
            let ty = expr_type(cx, fs, callee)?.decay();
            match ty.pointee() {
                Some(Type::Function { ret, .. }) => Ok((**ret).clone()),
                _ => Err(type_error(e.span, "called object is not a function")),
            }
        }
    }
}

fn type_error(span: Span, msg: &str) -> Diagnostic {
    Diagnostic::error(Kind::Type, span, msg.to_string())
}
