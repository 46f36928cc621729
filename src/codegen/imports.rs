// This module tracks the link metadata gathered during generation: the import table
// (library name plus the set of functions imported from it) and the export mapping
// (internal function identifier to exported symbol). Import registration is idempotent
// per (library, symbol) pair, so a symbol imported any number of times yields exactly
// one import-table slot, and every call site that resolves the pair gets the same slot
// label. Export registration is where duplicate-declaration conflicts surface: a
// function exported twice, two functions claiming one symbol, or an empty symbol are
// fatal at the point of registration, carrying the declaration's token.

//! Import-table and export-mapping aggregation.

use crate::core::error::{CodegenError, CodegenResult};
use crate::core::types::{CallConv, TypeInfo};
use crate::ir::{ImportDecl, Token};
use crate::x86::calling_convention::{import_slot_label, param_bytes};

/// One function imported from a dynamic library.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSymbol {
    pub symbol: String,
    pub convention: CallConv,
    /// Stack bytes of the declared parameter list.
    pub param_bytes: u32,
    pub return_type: TypeInfo,
    /// Label of the import-table slot holding the function's address.
    pub slot_label: String,
}

/// A dynamic library and the symbols imported from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportLibrary {
    pub name: String,
    pub symbols: Vec<ImportedSymbol>,
}

/// All import libraries of one compilation run.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    libraries: Vec<ImportLibrary>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an import declaration.
    ///
    /// Idempotent: re-registering a (library, symbol) pair leaves the table
    /// unchanged. Libraries and symbols keep first-registration order.
    pub fn register(&mut self, decl: &ImportDecl) {
        if self.lookup(&decl.library, &decl.symbol).is_some() {
            log::trace!("import {}!{} already registered", decl.library, decl.symbol);
            return;
        }

        let bytes = param_bytes(decl.params.iter());
        let entry = ImportedSymbol {
            symbol: decl.symbol.clone(),
            convention: decl.convention,
            param_bytes: bytes,
            return_type: decl.return_type.clone(),
            slot_label: import_slot_label(decl.convention, &decl.symbol, bytes),
        };
        log::debug!(
            "import {}!{} -> {}",
            decl.library,
            decl.symbol,
            entry.slot_label
        );

        match self.libraries.iter_mut().find(|l| l.name == decl.library) {
            Some(library) => library.symbols.push(entry),
            None => self.libraries.push(ImportLibrary {
                name: decl.library.clone(),
                symbols: vec![entry],
            }),
        }
    }

    /// Find a registered import by library and symbol.
    pub fn lookup(&self, library: &str, symbol: &str) -> Option<&ImportedSymbol> {
        self.libraries
            .iter()
            .find(|l| l.name == library)?
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
    }

    /// Libraries in first-registration order.
    pub fn libraries(&self) -> &[ImportLibrary] {
        &self.libraries
    }
}

/// The export mapping: internal function identifier to exported symbol.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    entries: Vec<(String, String)>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exported function.
    ///
    /// Duplicate identifiers, duplicate symbols and empty symbols are
    /// declaration conflicts and fail at this point.
    pub fn register(&mut self, identifier: &str, symbol: &str, token: &Token) -> CodegenResult<()> {
        if symbol.is_empty() {
            return Err(CodegenError::MissingExportSymbol {
                name: identifier.to_string(),
                line: token.line,
                column: token.column,
            });
        }
        if self.entries.iter().any(|(id, _)| id == identifier) {
            return Err(CodegenError::DuplicateExportFunction {
                name: identifier.to_string(),
                line: token.line,
                column: token.column,
            });
        }
        if self.entries.iter().any(|(_, sym)| sym == symbol) {
            return Err(CodegenError::DuplicateExportSymbol {
                symbol: symbol.to_string(),
                line: token.line,
                column: token.column,
            });
        }

        log::debug!("export {} as {}", identifier, symbol);
        self.entries.push((identifier.to_string(), symbol.to_string()));
        Ok(())
    }

    /// `(identifier, symbol)` pairs in registration order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// The exported symbol of an identifier, if registered.
    pub fn symbol_of(&self, identifier: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, sym)| sym.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(library: &str, symbol: &str, conv: CallConv, params: Vec<TypeInfo>) -> ImportDecl {
        ImportDecl {
            token: Token::new(symbol, 1, 1),
            library: library.to_string(),
            symbol: symbol.to_string(),
            convention: conv,
            params,
            return_type: TypeInfo::int(),
        }
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut table = ImportTable::new();
        let decl = import(
            "user32.dll",
            "MessageBoxA",
            CallConv::Stdcall,
            vec![
                TypeInfo::int(),
                TypeInfo::string(),
                TypeInfo::string(),
                TypeInfo::int(),
            ],
        );

        table.register(&decl);
        table.register(&decl);
        table.register(&decl);

        assert_eq!(table.libraries().len(), 1);
        assert_eq!(table.libraries()[0].symbols.len(), 1);

        let slot = &table.libraries()[0].symbols[0];
        assert_eq!(slot.param_bytes, 16);
        assert_eq!(slot.slot_label, "__imp__MessageBoxA@16");
    }

    #[test]
    fn test_one_library_many_symbols() {
        let mut table = ImportTable::new();
        table.register(&import("kernel32.dll", "ExitProcess", CallConv::Stdcall, vec![TypeInfo::int()]));
        table.register(&import("kernel32.dll", "GetTickCount", CallConv::Stdcall, vec![]));
        table.register(&import("msvcrt.dll", "printf", CallConv::Cdecl, vec![TypeInfo::string()]));

        assert_eq!(table.libraries().len(), 2);
        assert_eq!(table.libraries()[0].name, "kernel32.dll");
        assert_eq!(table.libraries()[0].symbols.len(), 2);
        assert!(table.lookup("msvcrt.dll", "printf").is_some());
        assert!(table.lookup("msvcrt.dll", "ExitProcess").is_none());
    }

    #[test]
    fn test_export_registration_and_lookup() {
        let mut exports = ExportTable::new();
        let token = Token::new("main", 1, 1);
        exports.register("main", "Start", &token).unwrap();

        assert_eq!(exports.entries(), &[("main".to_string(), "Start".to_string())]);
        assert_eq!(exports.symbol_of("main"), Some("Start"));
        assert_eq!(exports.symbol_of("other"), None);
    }

    #[test]
    fn test_export_conflicts_are_fatal() {
        let mut exports = ExportTable::new();
        let token = Token::new("main", 2, 5);
        exports.register("main", "Start", &token).unwrap();

        let twice = exports.register("main", "Start2", &token).unwrap_err();
        assert!(matches!(twice, CodegenError::DuplicateExportFunction { .. }));

        let stolen = exports.register("other", "Start", &token).unwrap_err();
        assert!(matches!(stolen, CodegenError::DuplicateExportSymbol { .. }));

        let empty = exports.register("third", "", &token).unwrap_err();
        assert!(matches!(empty, CodegenError::MissingExportSymbol { .. }));
    }
}
