// This module implements the two calling conventions of the Quill ABI on 32-bit x86.
// Both conventions push arguments right to left on the stack; they differ in who removes
// the argument area (cdecl: the caller, with `add esp, N` after the call; stdcall: the
// callee, with `ret N`) and in label decoration. The decoration scheme is part of the
// emission contract: cdecl symbols become `_name`, stdcall symbols become `_name@N` with
// N the byte size of the parameter list, and import-table slots prefix the decorated
// external name with `__imp_`. The scheme is collision-free because `@` and a leading
// underscore cannot occur in Quill identifiers. FrameLayout derives the stack frame of
// one function from its declaration: parameters live above the saved frame pointer at
// [ebp+8] onward, locals below it at [ebp-4] downward, each sized per its TypeInfo and
// aligned to the 4-byte stack granularity.

//! Calling-convention facts: argument order, stack cleanup ownership and
//! label decoration.
//!
//! The convention of the *callee* decides argument placement and cleanup at
//! every call site; callers consult this module instead of hard-coding
//! either convention.

use crate::core::types::{CallConv, TypeInfo};
use crate::ir::{FunctionDecl, Stmt};

/// Whether the callee pops its own argument area (`ret N`).
///
/// When this is false the caller restores `esp` after the call.
pub fn callee_cleans(conv: CallConv) -> bool {
    match conv {
        CallConv::Cdecl => false,
        CallConv::Stdcall => true,
    }
}

/// Total stack bytes occupied by a parameter list.
pub fn param_bytes<'a>(params: impl IntoIterator<Item = &'a TypeInfo>) -> u32 {
    params.into_iter().map(TypeInfo::stack_slot_size).sum()
}

/// Decorated label form of a function name.
///
/// Encodes the calling convention so that units, call sites and the
/// import/export system agree on one symbol per function:
/// `_name` for cdecl, `_name@N` for stdcall.
pub fn decorate(conv: CallConv, name: &str, param_bytes: u32) -> String {
    match conv {
        CallConv::Cdecl => format!("_{name}"),
        CallConv::Stdcall => format!("_{name}@{param_bytes}"),
    }
}

/// Label of the import-table slot holding an external function's address.
pub fn import_slot_label(conv: CallConv, symbol: &str, param_bytes: u32) -> String {
    format!("__imp_{}", decorate(conv, symbol, param_bytes))
}

/// One local variable's place in the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    /// Checker-assigned slot index.
    pub slot: usize,
    pub name: String,
    /// Negative ebp displacement of the slot's low address.
    pub offset: i32,
    pub size: u32,
}

/// Stack frame layout of one function, derived from its declaration.
///
/// Parameter `k` lives at `[ebp + param_offset(k)]`; the offsets accumulate
/// each parameter's stack-slot size starting at 8 (saved ebp plus return
/// address). Locals grow downward from `[ebp-4]` in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    locals: Vec<LocalSlot>,
    param_offsets: Vec<i32>,
    frame_size: u32,
}

impl FrameLayout {
    /// Compute the layout for a function declaration.
    pub fn for_function(decl: &FunctionDecl) -> Self {
        let mut param_offsets = Vec::with_capacity(decl.params.len());
        let mut running = 8i32;
        for param in &decl.params {
            param_offsets.push(running);
            running += param.type_info.stack_slot_size() as i32;
        }

        let mut locals = Vec::new();
        let mut depth = 0u32;
        for stmt in &decl.body {
            if let Stmt::Local(local) = stmt {
                let size = local.type_info.stack_slot_size().max(4);
                depth += size;
                locals.push(LocalSlot {
                    slot: local.slot,
                    name: local.name.clone(),
                    offset: -(depth as i32),
                    size,
                });
            }
        }

        Self {
            locals,
            param_offsets,
            frame_size: depth,
        }
    }

    /// Ebp displacement of a local slot, negative.
    pub fn local_offset(&self, slot: usize) -> Option<i32> {
        self.locals.iter().find(|l| l.slot == slot).map(|l| l.offset)
    }

    /// Ebp displacement of a parameter, positive.
    pub fn param_offset(&self, index: usize) -> Option<i32> {
        self.param_offsets.get(index).copied()
    }

    /// Bytes of local storage the prologue must reserve.
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    /// Local slots in declaration order.
    pub fn locals(&self) -> &[LocalSlot] {
        &self.locals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LocalDecl, Param, Token};

    fn tok(text: &str) -> Token {
        Token::new(text, 1, 1)
    }

    fn local(name: &str, slot: usize, type_info: TypeInfo) -> Stmt {
        Stmt::Local(LocalDecl {
            token: tok(name),
            name: name.to_string(),
            slot,
            type_info,
            init: None,
        })
    }

    fn function_with(params: Vec<Param>, body: Vec<Stmt>) -> FunctionDecl {
        FunctionDecl {
            token: tok("f"),
            name: "f".to_string(),
            convention: CallConv::Stdcall,
            return_type: TypeInfo::void(),
            params,
            export: None,
            body,
        }
    }

    #[test]
    fn test_cleanup_ownership() {
        assert!(!callee_cleans(CallConv::Cdecl));
        assert!(callee_cleans(CallConv::Stdcall));
    }

    #[test]
    fn test_decoration() {
        assert_eq!(decorate(CallConv::Cdecl, "puts", 4), "_puts");
        assert_eq!(decorate(CallConv::Stdcall, "MessageBoxA", 16), "_MessageBoxA@16");
    }

    #[test]
    fn test_import_slot_labels() {
        assert_eq!(
            import_slot_label(CallConv::Stdcall, "MessageBoxA", 16),
            "__imp__MessageBoxA@16"
        );
        assert_eq!(import_slot_label(CallConv::Cdecl, "printf", 0), "__imp__printf");
    }

    #[test]
    fn test_param_bytes_counts_wide_slots() {
        let types = [TypeInfo::int(), TypeInfo::float(), TypeInfo::string()];
        assert_eq!(param_bytes(types.iter()), 16);
    }

    #[test]
    fn test_param_offsets_accumulate_slot_sizes() {
        let decl = function_with(
            vec![
                Param {
                    name: "a".into(),
                    type_info: TypeInfo::int(),
                },
                Param {
                    name: "b".into(),
                    type_info: TypeInfo::float(),
                },
                Param {
                    name: "c".into(),
                    type_info: TypeInfo::int(),
                },
            ],
            vec![],
        );
        let frame = FrameLayout::for_function(&decl);

        assert_eq!(frame.param_offset(0), Some(8));
        assert_eq!(frame.param_offset(1), Some(12));
        // The float occupies 8 bytes, so the third parameter sits past it.
        assert_eq!(frame.param_offset(2), Some(20));
        assert_eq!(frame.param_offset(3), None);
    }

    #[test]
    fn test_local_offsets_grow_downward() {
        let decl = function_with(
            vec![],
            vec![
                local("x", 0, TypeInfo::int()),
                local("y", 1, TypeInfo::float()),
                local("z", 2, TypeInfo::boolean()),
            ],
        );
        let frame = FrameLayout::for_function(&decl);

        assert_eq!(frame.local_offset(0), Some(-4));
        assert_eq!(frame.local_offset(1), Some(-12));
        assert_eq!(frame.local_offset(2), Some(-16));
        assert_eq!(frame.local_offset(3), None);
        assert_eq!(frame.frame_size(), 16);
    }

    #[test]
    fn test_empty_function_has_no_frame() {
        let decl = function_with(vec![], vec![]);
        let frame = FrameLayout::for_function(&decl);
        assert_eq!(frame.frame_size(), 0);
        assert!(frame.locals().is_empty());
    }
}
