// This module provides the per-function compilation unit that aggregates generated
// instructions. FunctionUnit borrows its originating typed declaration for the unit's
// lifetime and derives everything declaration-shaped from that borrow: convention,
// parameters, export flag/symbol and the decorated entry label are accessor methods over
// the reference, never duplicated state, so declaration and unit cannot drift apart.
// The unit owns the frame layout computed from the declaration's locals and an
// append-only instruction sequence; push always succeeds and append order is emitted
// order. Emission produces the function's labeled assembly block at a requested
// indentation (entry label, then each instruction one level deeper) and is pure, so it
// can be called any number of times after generation completes with byte-identical
// results.

//! Per-function aggregation of generated instructions and their emission.

use crate::core::types::CallConv;
use crate::ir::{FunctionDecl, Param};
use crate::x86::calling_convention::{decorate, param_bytes, FrameLayout};
use crate::x86::instruction::Instruction;

/// Indentation unit for emitted assembly text.
const INDENT: &str = "    ";

/// The compilation unit of one source function.
///
/// Created when generation reaches the function's definition, mutated only
/// while its body is being compiled, read-only afterwards.
#[derive(Debug)]
pub struct FunctionUnit<'ir> {
    decl: &'ir FunctionDecl,
    frame: FrameLayout,
    instructions: Vec<Instruction>,
}

impl<'ir> FunctionUnit<'ir> {
    /// Create the unit for a declaration, computing its frame layout.
    pub fn new(decl: &'ir FunctionDecl) -> Self {
        Self {
            decl,
            frame: FrameLayout::for_function(decl),
            instructions: Vec::new(),
        }
    }

    /// Append one instruction; append order is emitted order.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// The instructions generated so far, in append order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The frame layout derived from the declaration.
    pub fn frame(&self) -> &FrameLayout {
        &self.frame
    }

    /// The originating typed declaration.
    pub fn decl(&self) -> &'ir FunctionDecl {
        self.decl
    }

    pub fn name(&self) -> &'ir str {
        &self.decl.name
    }

    pub fn convention(&self) -> CallConv {
        self.decl.convention
    }

    pub fn params(&self) -> &'ir [Param] {
        &self.decl.params
    }

    pub fn is_exported(&self) -> bool {
        self.decl.is_exported()
    }

    pub fn export_symbol(&self) -> Option<&'ir str> {
        self.decl.export.as_deref()
    }

    /// Stack bytes occupied by the declared parameters.
    pub fn param_bytes(&self) -> u32 {
        param_bytes(self.decl.params.iter().map(|p| &p.type_info))
    }

    /// Decorated entry label of this function.
    pub fn entry_label(&self) -> String {
        decorate(self.convention(), self.name(), self.param_bytes())
    }

    /// Emit the function's labeled assembly block.
    ///
    /// The entry label sits at `indent` levels, every instruction one level
    /// deeper. Deterministic; callable any number of times.
    pub fn emit(&self, indent: usize) -> String {
        let pad = INDENT.repeat(indent);
        let mut text = String::new();
        text.push_str(&pad);
        text.push_str(&self.entry_label());
        text.push_str(":\n");
        for instruction in &self.instructions {
            text.push_str(&pad);
            text.push_str(INDENT);
            text.push_str(&instruction.to_string());
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TypeInfo;
    use crate::ir::Token;
    use crate::x86::instruction::{Mnemonic, Operand};
    use crate::x86::registers::Register;

    fn decl(convention: CallConv, export: Option<&str>) -> FunctionDecl {
        FunctionDecl {
            token: Token::new("blend", 3, 1),
            name: "blend".to_string(),
            convention,
            return_type: TypeInfo::int(),
            params: vec![
                Param {
                    name: "a".into(),
                    type_info: TypeInfo::int(),
                },
                Param {
                    name: "b".into(),
                    type_info: TypeInfo::float(),
                },
            ],
            export: export.map(str::to_string),
            body: vec![],
        }
    }

    #[test]
    fn test_accessors_forward_to_declaration() {
        let decl = decl(CallConv::Stdcall, Some("Blend"));
        let unit = FunctionUnit::new(&decl);

        assert_eq!(unit.name(), "blend");
        assert_eq!(unit.convention(), CallConv::Stdcall);
        assert_eq!(unit.params().len(), 2);
        assert!(unit.is_exported());
        assert_eq!(unit.export_symbol(), Some("Blend"));
        assert_eq!(unit.param_bytes(), 12);
        assert_eq!(unit.entry_label(), "_blend@12");
    }

    #[test]
    fn test_cdecl_label_is_undecorated_past_the_underscore() {
        let decl = decl(CallConv::Cdecl, None);
        let unit = FunctionUnit::new(&decl);
        assert_eq!(unit.entry_label(), "_blend");
        assert!(!unit.is_exported());
        assert_eq!(unit.export_symbol(), None);
    }

    #[test]
    fn test_push_preserves_order() {
        let decl = decl(CallConv::Cdecl, None);
        let mut unit = FunctionUnit::new(&decl);
        unit.push(Instruction::unary(Mnemonic::Push, Operand::Reg(Register::Ebp)));
        unit.push(Instruction::binary(
            Mnemonic::Mov,
            Operand::Reg(Register::Ebp),
            Operand::Reg(Register::Esp),
        ));
        unit.push(Instruction::nullary(Mnemonic::Ret));

        let names: Vec<_> = unit
            .instructions()
            .iter()
            .map(|i| i.mnemonic.name())
            .collect();
        assert_eq!(names, ["push", "mov", "ret"]);
    }

    #[test]
    fn test_emit_label_and_indentation() {
        let decl = decl(CallConv::Stdcall, None);
        let mut unit = FunctionUnit::new(&decl);
        unit.push(Instruction::unary(Mnemonic::Push, Operand::Reg(Register::Ebp)));
        unit.push(Instruction::nullary(Mnemonic::Leave));

        let text = unit.emit(1);
        assert_eq!(text, "    _blend@12:\n        push ebp\n        leave\n");

        // Repeated emission is byte-identical.
        assert_eq!(unit.emit(1), text);
    }
}
