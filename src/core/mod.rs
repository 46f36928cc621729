// This module serves as the central hub for the backend's core infrastructure, the
// pieces shared by every other module: the type model (intrinsic tags, TypeInfo,
// calling-convention and origin enums), the error taxonomy for code generation, and the
// host-supplied compilation options that travel through the pipeline unmodified. The
// typed IR, the instruction model and the generation algorithm all build on these
// definitions, so this module has no dependencies on the rest of the crate.

//! Core backend infrastructure.
//!
//! Shared building blocks: the type model, error types, and host options.

pub mod error;
pub mod options;
pub mod types;

pub use error::{CodegenError, CodegenResult};
pub use options::CompileOptions;
pub use types::{CallConv, FnOrigin, IntrinsicType, TypeInfo};
