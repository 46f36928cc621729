// This module implements the code-generation algorithm. CompilationContext is the
// mutable aggregate of one compilation run: it owns a function unit per declared
// function, the six static-data pools, the import table, the export mapping and the
// optional icon, and it walks the typed program top to bottom in a single depth-first
// pass. Per function it installs a fresh unit, emits the parameter-binding prologue,
// selects instructions for each body statement, and closes with the epilogue mandated
// by the function's calling convention. Call sites resolve the callee's binding to one
// of three encodings: a direct label call for internal functions, an indirect call
// through the import-table slot for imported ones, and an indirect register call for
// function-pointer-typed locals and parameters; the callee's convention, never the
// caller's, decides argument cleanup. Literals intern into the pool matching their
// value and reference the pool-stable label. Anything the type checker should have
// rejected surfaces as a fatal CodegenError and aborts the run; when the walk finishes,
// finish() consumes the context into an immutable CompilationResult.

//! Code generation: the compilation context and program walk.
//!
//! Generation is a pure, synchronous, single-threaded transformation of the
//! typed tree; exactly one [`CompilationContext`] exists per run and it is
//! discarded once [`CompilationContext::finish`] produces the result.

pub mod data;
pub mod imports;
pub mod result;

use std::collections::HashMap;

use crate::core::error::{CodegenError, CodegenResult};
use crate::core::options::CompileOptions;
use crate::core::types::{CallConv, IntrinsicType};
use crate::ir::{
    Binding, CallExpr, Expr, FunctionDecl, IconData, LiteralExpr, LiteralValue, LocalDecl,
    Program, Stmt,
};
use crate::x86::calling_convention::{callee_cleans, decorate, param_bytes};
use crate::x86::function_unit::FunctionUnit;
use crate::x86::instruction::{Instruction, Mnemonic, Operand};
use crate::x86::registers::Register;

pub use data::DataPools;
pub use imports::{ExportTable, ImportLibrary, ImportTable, ImportedSymbol};
pub use result::CompilationResult;

/// Compile a type-checked program into an immutable result.
///
/// Convenience driver over [`CompilationContext`]; generation either fully
/// succeeds or yields nothing usable.
pub fn compile(program: &Program, options: CompileOptions) -> CodegenResult<CompilationResult<'_>> {
    let mut context = CompilationContext::new(options);
    context.compile_program(program)?;
    Ok(context.finish())
}

/// Pre-scanned call facts of an internal function.
#[derive(Debug, Clone)]
struct FnSig {
    convention: CallConv,
    param_bytes: u32,
}

/// The mutable aggregate of one compilation run.
///
/// Owns every table generation fills in; finalized into a
/// [`CompilationResult`] and discarded.
pub struct CompilationContext<'ir> {
    options: CompileOptions,
    units: Vec<FunctionUnit<'ir>>,
    pools: DataPools,
    imports: ImportTable,
    exports: ExportTable,
    icon: Option<IconData>,
    signatures: HashMap<String, FnSig>,
}

impl<'ir> CompilationContext<'ir> {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            units: Vec::new(),
            pools: DataPools::new(),
            imports: ImportTable::new(),
            exports: ExportTable::new(),
            icon: None,
            signatures: HashMap::new(),
        }
    }

    /// Walk the typed program and populate all aggregates.
    pub fn compile_program(&mut self, program: &'ir Program) -> CodegenResult<()> {
        log::info!(
            "compiling program: {} imports, {} functions, entry `{}`",
            program.imports.len(),
            program.functions.len(),
            self.options.entry_point
        );

        if let Some(icon) = &program.icon {
            self.set_icon(icon.clone())?;
        }
        for import in &program.imports {
            self.imports.register(import);
        }
        self.collect_signatures(&program.functions)?;
        for decl in &program.functions {
            self.compile_function(decl)?;
        }
        Ok(())
    }

    /// Record the program icon; at most one per program.
    pub fn set_icon(&mut self, icon: IconData) -> CodegenResult<()> {
        if self.icon.is_some() {
            return Err(CodegenError::DuplicateIcon);
        }
        self.icon = Some(icon);
        Ok(())
    }

    /// Reserve a zero-initialized static block, shared per size.
    pub fn reserve_scratch(&mut self, size: u32) -> String {
        self.pools.reserve_uninitialized(size)
    }

    /// Finalize the run into an immutable result, consuming the context.
    pub fn finish(self) -> CompilationResult<'ir> {
        CompilationResult::new(self)
    }

    fn collect_signatures(&mut self, functions: &'ir [FunctionDecl]) -> CodegenResult<()> {
        for decl in functions {
            let sig = FnSig {
                convention: decl.convention,
                param_bytes: param_bytes(decl.params.iter().map(|p| &p.type_info)),
            };
            if self.signatures.insert(decl.name.clone(), sig).is_some() {
                return Err(CodegenError::DuplicateFunction {
                    name: decl.name.clone(),
                    line: decl.token.line,
                    column: decl.token.column,
                });
            }
        }
        Ok(())
    }

    fn compile_function(&mut self, decl: &'ir FunctionDecl) -> CodegenResult<()> {
        log::debug!("compiling function `{}` ({})", decl.name, decl.convention);

        if let Some(symbol) = &decl.export {
            self.exports.register(&decl.name, symbol, &decl.token)?;
        }

        let mut unit = FunctionUnit::new(decl);
        self.emit_prologue(&mut unit);
        for stmt in &decl.body {
            self.compile_stmt(&mut unit, stmt)?;
        }
        // A trailing return already emitted the epilogue.
        if !matches!(decl.body.last(), Some(Stmt::Return { .. })) {
            self.emit_epilogue(&mut unit);
        }

        self.units.push(unit);
        Ok(())
    }

    /// Standard prologue: save the caller's frame, establish ours, reserve
    /// local storage. Parameter binding is the frame layout itself; the
    /// slots were assigned when the unit was created.
    fn emit_prologue(&self, unit: &mut FunctionUnit<'ir>) {
        for (index, param) in unit.params().iter().enumerate() {
            log::trace!(
                "  param `{}` at [ebp+{}]",
                param.name,
                unit.frame().param_offset(index).unwrap_or(0)
            );
        }

        unit.push(Instruction::unary(Mnemonic::Push, Operand::Reg(Register::Ebp)));
        unit.push(Instruction::binary(
            Mnemonic::Mov,
            Operand::Reg(Register::Ebp),
            Operand::Reg(Register::Esp),
        ));
        let frame = unit.frame().frame_size();
        if frame > 0 {
            unit.push(Instruction::binary(
                Mnemonic::Sub,
                Operand::Reg(Register::Esp),
                Operand::Imm(frame as i64),
            ));
        }
    }

    /// Standard epilogue: tear down the frame and return, popping the
    /// argument area when the convention makes the callee responsible.
    fn emit_epilogue(&self, unit: &mut FunctionUnit<'ir>) {
        unit.push(Instruction::nullary(Mnemonic::Leave));
        if callee_cleans(unit.convention()) && unit.param_bytes() > 0 {
            unit.push(Instruction::unary(
                Mnemonic::Ret,
                Operand::Imm(unit.param_bytes() as i64),
            ));
        } else {
            unit.push(Instruction::nullary(Mnemonic::Ret));
        }
    }

    fn compile_stmt(&mut self, unit: &mut FunctionUnit<'ir>, stmt: &'ir Stmt) -> CodegenResult<()> {
        match stmt {
            Stmt::Local(local) => self.compile_local(unit, local),
            Stmt::Expr(expr) => {
                // Evaluated for side effects; the value dies in eax.
                self.compile_expr(unit, expr)
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.compile_expr(unit, value)?;
                }
                self.emit_epilogue(unit);
                Ok(())
            }
        }
    }

    /// The slot was reserved by the frame layout; only an initializer
    /// produces instructions.
    fn compile_local(
        &mut self,
        unit: &mut FunctionUnit<'ir>,
        local: &'ir LocalDecl,
    ) -> CodegenResult<()> {
        log::trace!("  local `{}` (slot {})", local.name, local.slot);
        let Some(init) = &local.init else {
            return Ok(());
        };

        self.compile_expr(unit, init)?;
        let offset = unit.frame().local_offset(local.slot).ok_or_else(|| {
            CodegenError::UnresolvedSlot {
                function: unit.name().to_string(),
                slot: local.slot,
            }
        })?;
        let slot = Operand::Mem {
            base: Register::Ebp,
            offset,
        };
        if init.type_info().intrinsic == IntrinsicType::Float {
            unit.push(Instruction::unary(Mnemonic::Fstp, slot));
        } else {
            unit.push(Instruction::binary(
                Mnemonic::Mov,
                slot,
                Operand::Reg(Register::Eax),
            ));
        }
        Ok(())
    }

    /// Generate an expression; the value lands in eax, floats on the x87
    /// stack.
    fn compile_expr(&mut self, unit: &mut FunctionUnit<'ir>, expr: &'ir Expr) -> CodegenResult<()> {
        match expr {
            Expr::Literal(literal) => self.compile_literal(unit, literal),
            Expr::Call(call) => self.compile_call(unit, call),
            Expr::Ident(_) | Expr::Get(_) => {
                let place = self.resolve_place(unit, expr)?;
                if expr.type_info().intrinsic == IntrinsicType::Float {
                    unit.push(Instruction::unary(Mnemonic::Fld, place));
                } else {
                    unit.push(Instruction::binary(
                        Mnemonic::Mov,
                        Operand::Reg(Register::Eax),
                        place,
                    ));
                }
                Ok(())
            }
        }
    }

    /// Intern a literal and reference its pool-stable label. Booleans have
    /// no pool and load as immediates.
    fn compile_literal(
        &mut self,
        unit: &mut FunctionUnit<'ir>,
        literal: &'ir LiteralExpr,
    ) -> CodegenResult<()> {
        let eax = Operand::Reg(Register::Eax);
        match &literal.value {
            LiteralValue::Str(value) => {
                let label = self.pools.intern_string(value);
                unit.push(Instruction::binary(Mnemonic::Mov, eax, Operand::Label(label)));
            }
            LiteralValue::Int(value) => {
                let label = self.pools.intern_int(*value);
                unit.push(Instruction::binary(Mnemonic::Mov, eax, Operand::MemLabel(label)));
            }
            LiteralValue::Float(value) => {
                let label = self.pools.intern_float(*value);
                unit.push(Instruction::unary(Mnemonic::Fld, Operand::MemLabel(label)));
            }
            LiteralValue::Byte(value) => {
                let label = self.pools.intern_byte(*value);
                unit.push(Instruction::binary(
                    Mnemonic::Movzx,
                    eax,
                    Operand::MemLabel(label),
                ));
            }
            LiteralValue::Ptr(value) => {
                let label = self.pools.intern_pointer(*value);
                unit.push(Instruction::binary(Mnemonic::Mov, eax, Operand::MemLabel(label)));
            }
            LiteralValue::Bool(value) => {
                unit.push(Instruction::binary(Mnemonic::Mov, eax, Operand::Imm(*value as i64)));
            }
        }
        Ok(())
    }

    /// Generate a call: arguments right to left, then the callee-specific
    /// call encoding, then caller cleanup when the callee's convention
    /// leaves the argument area to us.
    fn compile_call(&mut self, unit: &mut FunctionUnit<'ir>, call: &'ir CallExpr) -> CodegenResult<()> {
        let mut pushed = 0u32;
        for arg in call.args.iter().rev() {
            self.compile_expr(unit, arg)?;
            if arg.type_info().intrinsic == IntrinsicType::Float {
                unit.push(Instruction::binary(
                    Mnemonic::Sub,
                    Operand::Reg(Register::Esp),
                    Operand::Imm(8),
                ));
                unit.push(Instruction::unary(
                    Mnemonic::Fstp,
                    Operand::Mem {
                        base: Register::Esp,
                        offset: 0,
                    },
                ));
                pushed += 8;
            } else {
                unit.push(Instruction::unary(Mnemonic::Push, Operand::Reg(Register::Eax)));
                pushed += 4;
            }
        }

        let convention = self.compile_callee(unit, call)?;
        if !callee_cleans(convention) && pushed > 0 {
            unit.push(Instruction::binary(
                Mnemonic::Add,
                Operand::Reg(Register::Esp),
                Operand::Imm(pushed as i64),
            ));
        }
        Ok(())
    }

    /// Emit the call instruction for the resolved callee and report the
    /// convention that governs cleanup.
    fn compile_callee(
        &mut self,
        unit: &mut FunctionUnit<'ir>,
        call: &'ir CallExpr,
    ) -> CodegenResult<CallConv> {
        if let Expr::Ident(ident) = call.callee.as_ref() {
            match &ident.binding {
                Binding::Function(name) => {
                    let sig = self.signatures.get(name).ok_or_else(|| {
                        CodegenError::UnknownFunction {
                            name: name.clone(),
                            line: ident.token.line,
                            column: ident.token.column,
                        }
                    })?;
                    log::trace!("  call internal `{}`", name);
                    unit.push(Instruction::unary(
                        Mnemonic::Call,
                        Operand::Label(decorate(sig.convention, name, sig.param_bytes)),
                    ));
                    return Ok(sig.convention);
                }
                Binding::Import { library, symbol } => {
                    let import = self.imports.lookup(library, symbol).ok_or_else(|| {
                        CodegenError::UnknownImport {
                            library: library.clone(),
                            symbol: symbol.clone(),
                            line: ident.token.line,
                            column: ident.token.column,
                        }
                    })?;
                    log::trace!("  call import {}!{}", library, symbol);
                    unit.push(Instruction::unary(
                        Mnemonic::Call,
                        Operand::MemLabel(import.slot_label.clone()),
                    ));
                    return Ok(import.convention);
                }
                Binding::Local(_) | Binding::Param(_) => {}
            }
        }

        // A function-pointer-typed place: load the address, call through it.
        let callee = call.callee.as_ref();
        let convention = callee.type_info().intrinsic.call_conv().ok_or_else(|| {
            CodegenError::NotCallable {
                name: callee.token().text.clone(),
                line: callee.token().line,
                column: callee.token().column,
            }
        })?;
        let place = self.resolve_place(unit, callee)?;
        log::trace!("  indirect call through `{}`", callee.token().text);
        unit.push(Instruction::binary(
            Mnemonic::Mov,
            Operand::Reg(Register::Eax),
            place,
        ));
        unit.push(Instruction::unary(Mnemonic::Call, Operand::Reg(Register::Eax)));
        Ok(convention)
    }

    /// Resolve an expression to the memory operand holding its value.
    fn resolve_place(
        &self,
        unit: &FunctionUnit<'ir>,
        expr: &'ir Expr,
    ) -> CodegenResult<Operand> {
        match expr {
            Expr::Ident(ident) => match &ident.binding {
                Binding::Local(slot) => {
                    let offset = unit.frame().local_offset(*slot).ok_or_else(|| {
                        CodegenError::UnresolvedSlot {
                            function: unit.name().to_string(),
                            slot: *slot,
                        }
                    })?;
                    Ok(Operand::Mem {
                        base: Register::Ebp,
                        offset,
                    })
                }
                Binding::Param(index) => {
                    let offset = unit.frame().param_offset(*index).ok_or_else(|| {
                        CodegenError::UnresolvedParam {
                            function: unit.name().to_string(),
                            index: *index,
                        }
                    })?;
                    Ok(Operand::Mem {
                        base: Register::Ebp,
                        offset,
                    })
                }
                Binding::Function(_) | Binding::Import { .. } => {
                    Err(CodegenError::NotAddressable {
                        line: ident.token.line,
                        column: ident.token.column,
                    })
                }
            },
            Expr::Get(get) => {
                let base = self.resolve_place(unit, &get.object)?;
                match base {
                    Operand::Mem { base, offset } => Ok(Operand::Mem {
                        base,
                        offset: offset + get.field.offset,
                    }),
                    _ => Err(CodegenError::InvalidFieldAccess {
                        line: get.token.line,
                        column: get.token.column,
                    }),
                }
            }
            _ => Err(CodegenError::NotAddressable {
                line: expr.token().line,
                column: expr.token().column,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FnOrigin, TypeInfo};
    use crate::ir::{IdentExpr, Token};

    fn tok(text: &str) -> Token {
        Token::new(text, 1, 1)
    }

    fn empty_function(name: &str, convention: CallConv) -> FunctionDecl {
        FunctionDecl {
            token: tok(name),
            name: name.to_string(),
            convention,
            return_type: TypeInfo::void(),
            params: vec![],
            export: None,
            body: vec![],
        }
    }

    #[test]
    fn test_duplicate_icon_is_fatal() {
        let mut context = CompilationContext::new(CompileOptions::default());
        context.set_icon(IconData(vec![1, 2, 3])).unwrap();
        let err = context.set_icon(IconData(vec![4])).unwrap_err();
        assert_eq!(err, CodegenError::DuplicateIcon);
    }

    #[test]
    fn test_duplicate_function_is_fatal() {
        let program = Program {
            imports: vec![],
            functions: vec![
                empty_function("twice", CallConv::Cdecl),
                empty_function("twice", CallConv::Stdcall),
            ],
            icon: None,
        };
        let err = compile(&program, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateFunction { ref name, .. } if name == "twice"));
    }

    #[test]
    fn test_call_to_unregistered_import_is_fatal() {
        let mut decl = empty_function("main", CallConv::Cdecl);
        decl.body = vec![Stmt::Expr(Expr::Call(CallExpr {
            token: tok("Beep"),
            callee: Box::new(Expr::Ident(IdentExpr {
                token: tok("Beep"),
                binding: Binding::Import {
                    library: "kernel32.dll".into(),
                    symbol: "Beep".into(),
                },
                type_info: TypeInfo::function(
                    CallConv::Stdcall,
                    FnOrigin::External,
                    TypeInfo::void(),
                ),
            })),
            args: vec![],
            type_info: TypeInfo::void(),
        }))];
        let program = Program {
            imports: vec![],
            functions: vec![decl],
            icon: None,
        };

        let err = compile(&program, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CodegenError::UnknownImport { ref symbol, .. } if symbol == "Beep"));
    }

    #[test]
    fn test_literal_callee_is_not_callable() {
        let mut decl = empty_function("main", CallConv::Cdecl);
        decl.body = vec![Stmt::Expr(Expr::Call(CallExpr {
            token: tok("3"),
            callee: Box::new(Expr::Literal(LiteralExpr {
                token: tok("3"),
                value: LiteralValue::Int(3),
                type_info: TypeInfo::int(),
            })),
            args: vec![],
            type_info: TypeInfo::void(),
        }))];
        let program = Program {
            imports: vec![],
            functions: vec![decl],
            icon: None,
        };

        let err = compile(&program, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CodegenError::NotCallable { .. }));
    }

    #[test]
    fn test_boolean_literal_loads_an_immediate() {
        let mut decl = empty_function("flags", CallConv::Cdecl);
        decl.body = vec![Stmt::Expr(Expr::Literal(LiteralExpr {
            token: tok("true"),
            value: LiteralValue::Bool(true),
            type_info: TypeInfo::boolean(),
        }))];
        let program = Program {
            imports: vec![],
            functions: vec![decl],
            icon: None,
        };

        let result = compile(&program, CompileOptions::default()).unwrap();
        let text = result.emit_functions(0);
        assert!(text.contains("mov eax, 1"));
        // No pool entry was created for the boolean.
        assert!(result.ints().is_empty());
    }

    #[test]
    fn test_scratch_reservation_shares_per_size() {
        let mut context = CompilationContext::new(CompileOptions::default());
        let a = context.reserve_scratch(128);
        let b = context.reserve_scratch(128);
        assert_eq!(a, b);
    }
}
