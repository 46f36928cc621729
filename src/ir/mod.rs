// This module defines the typed intermediate representation the code generator consumes.
// The Quill type checker produces this tree: every node carries the source token it came
// from (for diagnostics) and a fully resolved TypeInfo, and every identifier has been
// bound to a function, an import, a parameter or a local slot. The backend reads the
// tree and never mutates it; ownership stays with the compilation run so function units
// can borrow declarations for their whole lifetime. Node families: Program is the root
// (imports, function definitions, optional icon resource), statements are local
// declarations, expression statements and returns, and expressions are calls, bound
// identifiers, member accesses and typed literals. Bindings and field offsets are
// resolved values, not names to look up, which is what lets generation run in a single
// pass.

//! The typed IR consumed by code generation.
//!
//! Produced by the external type checker, read-only to this crate. Every
//! node carries its originating [`Token`] and a resolved
//! [`TypeInfo`](crate::core::TypeInfo); identifiers arrive pre-bound.

use crate::core::types::{CallConv, TypeInfo};

/// Source token a node was produced from, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            text: text.into(),
            line,
            column,
        }
    }
}

/// Optional icon resource payload, at most one per program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconData(pub Vec<u8>);

/// Root of a type-checked program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub imports: Vec<ImportDecl>,
    pub functions: Vec<FunctionDecl>,
    pub icon: Option<IconData>,
}

/// A function imported from a dynamic library.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub token: Token,
    /// Library file name, e.g. `user32.dll`.
    pub library: String,
    /// Symbol name as exported by the library.
    pub symbol: String,
    pub convention: CallConv,
    pub params: Vec<TypeInfo>,
    pub return_type: TypeInfo,
}

/// A function defined by the program.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub token: Token,
    pub name: String,
    pub convention: CallConv,
    pub return_type: TypeInfo,
    pub params: Vec<Param>,
    /// Exported symbol name when the function is marked for export.
    pub export: Option<String>,
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn is_exported(&self) -> bool {
        self.export.is_some()
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_info: TypeInfo,
}

/// Typed statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Local variable declaration, with optional initializer.
    Local(LocalDecl),
    /// Expression evaluated for its side effects; the value is discarded.
    Expr(Expr),
    /// Return from the enclosing function.
    Return { token: Token, value: Option<Expr> },
}

/// A local variable declaration.
///
/// The checker assigns `slot` indices densely in declaration order within
/// each function; the backend turns them into frame offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub token: Token,
    pub name: String,
    pub slot: usize,
    pub type_info: TypeInfo,
    pub init: Option<Expr>,
}

/// Typed expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call(CallExpr),
    Ident(IdentExpr),
    Get(GetExpr),
    Literal(LiteralExpr),
}

impl Expr {
    pub fn token(&self) -> &Token {
        match self {
            Expr::Call(e) => &e.token,
            Expr::Ident(e) => &e.token,
            Expr::Get(e) => &e.token,
            Expr::Literal(e) => &e.token,
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        match self {
            Expr::Call(e) => &e.type_info,
            Expr::Ident(e) => &e.type_info,
            Expr::Get(e) => &e.type_info,
            Expr::Literal(e) => &e.type_info,
        }
    }
}

/// Call of a resolved callee with already-typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub token: Token,
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    /// The call's result type (the callee's return type).
    pub type_info: TypeInfo,
}

/// A bound identifier reference.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentExpr {
    pub token: Token,
    pub binding: Binding,
    pub type_info: TypeInfo,
}

/// Member access; the checker resolved the field to a byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct GetExpr {
    pub token: Token,
    pub object: Box<Expr>,
    pub field: Field,
    pub type_info: TypeInfo,
}

/// A resolved struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub offset: i32,
}

/// A typed constant.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    pub token: Token,
    pub value: LiteralValue,
    pub type_info: TypeInfo,
}

/// What an identifier resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A function defined in this program.
    Function(String),
    /// An imported function.
    Import { library: String, symbol: String },
    /// A local variable slot of the enclosing function.
    Local(usize),
    /// A parameter of the enclosing function, by position.
    Param(usize),
}

/// Literal constant values.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i32),
    Float(f64),
    Str(String),
    Byte(u8),
    /// A raw address constant.
    Ptr(u32),
    Bool(bool),
}
