// This module defines the immutable outcome of one compilation run. CompilationResult
// is constructed exactly once from a finished CompilationContext: every aggregate the
// walk filled in (function units, import table, export mapping, static-data pools,
// icon) moves by value into private fields, and the options the host supplied travel
// along unmodified. The result exposes read-only accessors and a deterministic
// emit_functions helper; it holds no reference back into the discarded context, so it
// is the sole artifact that crosses the boundary to the external assembler/linker
// stage. Function units keep borrowing the typed tree, which is owned by the
// compilation run and outlives both context and result.

//! The immutable compilation result handed to the emission stage.

use crate::codegen::data::DataPools;
use crate::codegen::imports::{ExportTable, ImportLibrary, ImportTable};
use crate::codegen::CompilationContext;
use crate::core::options::CompileOptions;
use crate::ir::IconData;
use crate::x86::function_unit::FunctionUnit;

/// Snapshot of a finished compilation run.
///
/// Built once by [`CompilationContext::finish`]; read-only thereafter.
#[derive(Debug)]
pub struct CompilationResult<'ir> {
    options: CompileOptions,
    functions: Vec<FunctionUnit<'ir>>,
    imports: ImportTable,
    exports: ExportTable,
    pools: DataPools,
    icon: Option<IconData>,
}

impl<'ir> CompilationResult<'ir> {
    /// Copy the final state out of a finished context.
    pub(crate) fn new(context: CompilationContext<'ir>) -> Self {
        log::info!(
            "compilation finished: {} functions, {} import libraries, {} exports",
            context.units.len(),
            context.imports.libraries().len(),
            context.exports.entries().len()
        );
        Self {
            options: context.options,
            functions: context.units,
            imports: context.imports,
            exports: context.exports,
            pools: context.pools,
            icon: context.icon,
        }
    }

    /// The host options, stored unmodified.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiled functions in declaration order.
    pub fn functions(&self) -> &[FunctionUnit<'ir>] {
        &self.functions
    }

    /// Import libraries in first-registration order.
    pub fn import_libraries(&self) -> &[ImportLibrary] {
        self.imports.libraries()
    }

    /// The export mapping as `(identifier, symbol)` pairs.
    pub fn exports(&self) -> &[(String, String)] {
        self.exports.entries()
    }

    pub fn strings(&self) -> &[(String, String)] {
        self.pools.strings()
    }

    pub fn floats(&self) -> &[(String, f64)] {
        self.pools.floats()
    }

    pub fn ints(&self) -> &[(String, i32)] {
        self.pools.ints()
    }

    pub fn bytes(&self) -> &[(String, u8)] {
        self.pools.bytes()
    }

    pub fn pointers(&self) -> &[(String, u32)] {
        self.pools.pointers()
    }

    /// Zero-initialized blocks as `(label, byte size)` pairs.
    pub fn uninitialized(&self) -> &[(String, u32)] {
        self.pools.uninitialized()
    }

    pub fn icon(&self) -> Option<&IconData> {
        self.icon.as_ref()
    }

    /// Emit every function's assembly block in declaration order.
    pub fn emit_functions(&self, indent: usize) -> String {
        self.functions.iter().map(|unit| unit.emit(indent)).collect()
    }
}
