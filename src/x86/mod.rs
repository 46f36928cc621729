//! x86 architecture-specific components.
//!
//! This module contains all target-specific code:
//! - The register set and the textual instruction model
//! - The cdecl/stdcall calling conventions and label decoration
//! - The per-function compilation unit and its assembly emission

pub mod calling_convention;
pub mod function_unit;
pub mod instruction;
pub mod registers;

pub use calling_convention::{
    callee_cleans, decorate, import_slot_label, param_bytes, FrameLayout, LocalSlot,
};
pub use function_unit::FunctionUnit;
pub use instruction::{Instruction, Mnemonic, Operand};
pub use registers::Register;
