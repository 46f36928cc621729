// This module defines error types for the Quill code generator using the thiserror crate
// for idiomatic Rust error handling. CodegenError is the main error enum covering the
// failure scenarios of the backend: non-callable callee expressions, calls to unknown
// functions or unregistered imports, duplicate function/export/icon declarations, empty
// export symbols, invalid member accesses, and unresolved local slots. Every condition in
// this taxonomy is a violation of the type checker's precondition or a declaration
// conflict, so each variant is fatal for the enclosing compilation run and carries the
// offending source position for diagnostics. The module also provides CodegenResult<T>
// as a convenience type alias for Result<T, CodegenError>. These error types enable
// proper error propagation throughout the generator with descriptive messages via the
// Display trait implementation provided by thiserror.

//! Error types for the Quill code generator.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Main error type for code generation.
///
/// Every variant is fatal for the current compilation run: the conditions
/// below should have been rejected by the type checker or are declaration
/// conflicts, and the generator never patches over them. Variants carry the
/// source position of the offending node where one exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("`{name}` is not callable (line {line}, column {column})")]
    NotCallable {
        name: String,
        line: u32,
        column: u32,
    },

    #[error("call to unknown function `{name}` (line {line}, column {column})")]
    UnknownFunction {
        name: String,
        line: u32,
        column: u32,
    },

    #[error("call to unregistered import `{symbol}` from `{library}` (line {line}, column {column})")]
    UnknownImport {
        library: String,
        symbol: String,
        line: u32,
        column: u32,
    },

    #[error("duplicate definition of function `{name}` (line {line}, column {column})")]
    DuplicateFunction {
        name: String,
        line: u32,
        column: u32,
    },

    #[error("exported function `{name}` has an empty export symbol (line {line}, column {column})")]
    MissingExportSymbol {
        name: String,
        line: u32,
        column: u32,
    },

    #[error("export symbol `{symbol}` is already in use (line {line}, column {column})")]
    DuplicateExportSymbol {
        symbol: String,
        line: u32,
        column: u32,
    },

    #[error("function `{name}` is exported more than once (line {line}, column {column})")]
    DuplicateExportFunction {
        name: String,
        line: u32,
        column: u32,
    },

    #[error("program declares more than one icon resource")]
    DuplicateIcon,

    #[error("member access on a value without a memory location (line {line}, column {column})")]
    InvalidFieldAccess { line: u32, column: u32 },

    #[error("unresolved local slot {slot} in function `{function}`")]
    UnresolvedSlot { function: String, slot: usize },

    #[error("unresolved parameter {index} in function `{function}`")]
    UnresolvedParam { function: String, index: usize },

    #[error("expression has no memory location (line {line}, column {column})")]
    NotAddressable { line: u32, column: u32 },
}

/// Result type alias for code generation operations.
pub type CodegenResult<T> = Result<T, CodegenError>;
