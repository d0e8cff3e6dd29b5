//! Statement and control-flow code generation, and the per-function
//! compilation driver.
//!
//! Local variable storage is always the function's single bulk stack
//! reservation, sized after the whole body has been walked once: there is no
//! per-block `SUB`/`ADD SP` bracketing, so a local declared inside a loop
//! body still gets one fixed `FP`-relative slot shared by every iteration,
//! and a `break`/`continue`/`return` out of a nested block never needs to
//! patch `SP` back up. `FuncState::vars` scope push/pop still tracks name
//! visibility and shadowing; it just doesn't gate storage.

use crate::ast::{Block, Declaration, FunctionDef, Stmt, StorageClass};
use crate::codegen::asm::{Instruction, Operand, Reg};
use crate::codegen::expr::compile_rvalue;
use crate::codegen::state::{FuncState, LoopLabels, Storage, VarInfo, ACC, ADDR};
use crate::codegen::CodegenCtx;
use crate::diagnostics::{Diagnostic, Kind, Span};
use crate::sema::typeck;

type CResult<T> = Result<T, Diagnostic>;

/// Compiles one function definition into a complete, self-contained
/// instruction sequence: label, prologue, body, epilogue.
pub fn compile_function(cx: &mut CodegenCtx, f: &FunctionDef) -> CResult<Vec<Instruction>> {
    let (_, name, span) = typeck::resolve_declarator(f.spec.base.to_type(), &f.declarator)?;
    let name = name.ok_or_else(|| Diagnostic::error(Kind::Parse, span, "function definition has no name"))?;

    let mut fs = FuncState::new(&name);
    for (i, p) in f.params.iter().enumerate() {
        let ty = p.resolved_type().decay();
        if let Some(pname) = p.name() {
            fs.vars.declare(pname, VarInfo { ty, storage: Storage::Local(2 + i as i32) });
        }
    }

    let mut body = Vec::new();
    compile_stmts(cx, &mut fs, &mut body, &f.body.stmts)?;

    let mut out = Vec::with_capacity(body.len() + 8);
    out.push(Instruction::Label(name));
    out.push(Instruction::Push(Reg::FP));
    out.push(Instruction::Load(Reg::FP, Operand::Reg(Reg::SP)));
    let frame_words = fs.frame_words();
    if frame_words > 0 {
        out.push(Instruction::Sub(Reg::SP, Operand::Immediate(frame_words as i32)));
    }
    out.extend(body);
    out.extend(epilogue());
    Ok(out)
}

/// `LOAD SP,FP; POP FP; EXIT` -- restores the caller's frame regardless of
/// how much of the reserved frame was actually touched on this path.
fn epilogue() -> Vec<Instruction> {
    vec![
        Instruction::Load(Reg::SP, Operand::Reg(Reg::FP)),
        Instruction::Pop(Reg::FP),
        Instruction::Ret,
    ]
}

fn compile_stmts(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    stmts: &[Stmt],
) -> CResult<()> {
    for s in stmts {
        compile_stmt(cx, fs, out, s)?;
    }
    Ok(())
}

fn compile_stmt(cx: &mut CodegenCtx, fs: &mut FuncState, out: &mut Vec<Instruction>, s: &Stmt) -> CResult<()> {
    match s {
        Stmt::Expr(e) => {
            compile_rvalue(cx, fs, out, e)?;
            Ok(())
        }
        Stmt::Decl(d) => compile_decl(cx, fs, out, d),
        Stmt::Block(b) => compile_nested_block(cx, fs, out, b),
        Stmt::If { cond, then_branch, else_branch } => {
            compile_rvalue(cx, fs, out, cond)?;
            out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
            let else_label = fs.fresh_label("if_else");
            let end_label = fs.fresh_label("if_end");
            out.push(Instruction::JumpEq(else_label.clone()));
            compile_stmt(cx, fs, out, then_branch)?;
            if let Some(else_branch) = else_branch {
                out.push(Instruction::Jump(end_label.clone()));
                out.push(Instruction::Label(else_label));
                compile_stmt(cx, fs, out, else_branch)?;
                out.push(Instruction::Label(end_label));
            } else {
                out.push(Instruction::Label(else_label));
            }
            Ok(())
        }
        Stmt::While { cond, body } => {
            let cond_label = fs.fresh_label("while_cond");
            let end_label = fs.fresh_label("while_end");
            out.push(Instruction::Label(cond_label.clone()));
            compile_rvalue(cx, fs, out, cond)?;
            out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
            out.push(Instruction::JumpEq(end_label.clone()));
            fs.loop_stack.push(LoopLabels {
                continue_label: cond_label.clone(),
                break_label: end_label.clone(),
            });
            compile_stmt(cx, fs, out, body)?;
            fs.loop_stack.pop();
            out.push(Instruction::Jump(cond_label));
            out.push(Instruction::Label(end_label));
            Ok(())
        }
        Stmt::DoWhile { body, cond } => {
            let body_label = fs.fresh_label("do_body");
            let cond_label = fs.fresh_label("do_cond");
            let end_label = fs.fresh_label("do_end");
            out.push(Instruction::Label(body_label.clone()));
            fs.loop_stack.push(LoopLabels {
                continue_label: cond_label.clone(),
                break_label: end_label.clone(),
            });
            compile_stmt(cx, fs, out, body)?;
            fs.loop_stack.pop();
            out.push(Instruction::Label(cond_label));
            compile_rvalue(cx, fs, out, cond)?;
            out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
            out.push(Instruction::JumpNe(body_label));
            out.push(Instruction::Label(end_label));
            Ok(())
        }
        Stmt::For { init, cond, step, body } => {
            fs.vars.push();
            if let Some(init) = init {
                compile_stmt(cx, fs, out, init)?;
            }
            let cond_label = fs.fresh_label("for_cond");
            let step_label = fs.fresh_label("for_step");
            let end_label = fs.fresh_label("for_end");
            out.push(Instruction::Label(cond_label.clone()));
            if let Some(cond) = cond {
                compile_rvalue(cx, fs, out, cond)?;
                out.push(Instruction::Comp(ACC, Operand::Immediate(0)));
                out.push(Instruction::JumpEq(end_label.clone()));
            }
            fs.loop_stack.push(LoopLabels {
                continue_label: step_label.clone(),
                break_label: end_label.clone(),
            });
            compile_stmt(cx, fs, out, body)?;
            fs.loop_stack.pop();
            out.push(Instruction::Label(step_label));
            if let Some(step) = step {
                compile_rvalue(cx, fs, out, step)?;
            }
            out.push(Instruction::Jump(cond_label));
            out.push(Instruction::Label(end_label));
            fs.vars.pop();
            Ok(())
        }
        Stmt::Break(span) => emit_loop_jump(fs, out, *span, true),
        Stmt::Continue(span) => emit_loop_jump(fs, out, *span, false),
        Stmt::Return(value, _span) => {
            if let Some(e) = value {
                compile_rvalue(cx, fs, out, e)?;
            }
            out.extend(epilogue());
            Ok(())
        }
        Stmt::Null => Ok(()),
    }
}

fn compile_nested_block(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    b: &Block,
) -> CResult<()> {
    fs.vars.push();
    let r = compile_stmts(cx, fs, out, &b.stmts);
    fs.vars.pop();
    r
}

fn emit_loop_jump(fs: &FuncState, out: &mut Vec<Instruction>, span: Span, is_break: bool) -> CResult<()> {
    let labels = fs.loop_stack.last().ok_or_else(|| {
        let what = if is_break { "break" } else { "continue" };
        Diagnostic::error(Kind::Codegen, span, format!("'{what}' statement not in a loop"))
    })?;
    let target = if is_break { &labels.break_label } else { &labels.continue_label };
    out.push(Instruction::Jump(target.clone()));
    Ok(())
}

/// Block-scope declarations. `static` locals get a dedicated data/bss slot
/// (persisting across calls, initialized once at program load); `extern`
/// locals bind the name to the existing file-scope symbol; everything else
/// is an ordinary stack local, initialized -- if at all -- by an assignment
/// emitted right at the declaration point, after the name is already in
/// scope (so a self-referential initializer reads whatever garbage is on
/// the stack, exactly as unspecified C behavior allows).
fn compile_decl(
    cx: &mut CodegenCtx,
    fs: &mut FuncState,
    out: &mut Vec<Instruction>,
    decl: &Declaration,
) -> CResult<()> {
    // `register` is advisory only in this target; it falls through to the
    // ordinary automatic-local arm below like `auto`/no storage class.
    for item in &decl.items {
        let (ty, name, span) = typeck::resolve_declarator(decl.spec.base.to_type(), &item.declarator)?;
        let Some(name) = name else { continue };

        match decl.spec.storage {
            Some(StorageClass::Static) => {
                let label = fs.static_local_label(&name);
                cx.declare_static_local(&label, &ty, item.init.as_ref(), span)?;
                fs.vars.declare(&name, VarInfo { ty, storage: Storage::Global(label) });
            }
            Some(StorageClass::Extern) => {
                if item.init.is_some() {
                    return Err(Diagnostic::error(
                        Kind::Linkage,
                        span,
                        "'extern' local cannot have an initializer",
                    ));
                }
                let info = cx.global_var_info(&name).ok_or_else(|| {
                    Diagnostic::error(Kind::Undeclared, span, format!("no previous declaration of '{name}'"))
                })?;
                fs.vars.declare(&name, info);
            }
            Some(StorageClass::Auto) | Some(StorageClass::Register) | None => {
                if matches!(&ty, crate::types::Type::Array { len: None, .. }) {
                    return Err(Diagnostic::error(
                        Kind::Type,
                        span,
                        format!("'{name}' has incomplete array type"),
                    ));
                }
                let size = ty.size_words().max(1);
                let offset = fs.alloc_local(size);
                fs.vars.declare(&name, VarInfo { ty, storage: Storage::Local(offset) });
                if let Some(init) = &item.init {
                    out.push(Instruction::Load(ADDR, Operand::Immediate(offset)));
                    out.push(Instruction::Add(ADDR, Operand::Reg(Reg::FP)));
                    out.push(Instruction::Push(ADDR));
                    compile_rvalue(cx, fs, out, init)?;
                    out.push(Instruction::Pop(ADDR));
                    out.push(Instruction::Store(ACC, Operand::Mem { base: ADDR, offset: 0 }));
                }
            }
        }
    }
    Ok(())
}
