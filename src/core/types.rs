// This module defines the type model shared by the whole backend. IntrinsicType is the
// closed set of type tags the Quill checker resolves every expression to: the primitive
// kinds (void, int, float, string, boolean), raw pointers, structs, and four indirect
// function-pointer variants that cross the two supported calling conventions (cdecl,
// stdcall) with the function's origin (defined in this program vs. imported from a
// dynamic library). Origin and convention together fully determine how a call through a
// value of that type is encoded, which is why they are part of the tag. TypeInfo wraps a
// tag with an optional nested TypeInfo for composite kinds: function pointers carry
// their return type, Ptr/Struct may carry a pointee/field type. The module exposes named
// constructors and the 32-bit target's size queries; it performs no validation because
// type correctness is established by the checker before this crate ever runs.

//! The Quill type model.
//!
//! Pure data describing resolved types. Construction helpers and size
//! queries only; the external type checker guarantees well-formedness and
//! this crate trusts incoming [`TypeInfo`] values without re-verifying them.

use std::fmt;

/// Calling conventions supported by the backend.
///
/// The convention governs argument order, stack cleanup ownership and label
/// decoration; see `x86::calling_convention` for the encoding rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConv {
    /// Caller cleans the argument area after the call returns.
    Cdecl,
    /// Callee pops its own arguments with `ret N`.
    Stdcall,
}

impl fmt::Display for CallConv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallConv::Cdecl => write!(f, "cdecl"),
            CallConv::Stdcall => write!(f, "stdcall"),
        }
    }
}

/// Where a function comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FnOrigin {
    /// Defined by the program being compiled; callable through a direct label.
    Internal,
    /// Imported from a dynamic library; callable through an import-table slot.
    External,
}

/// Closed set of intrinsic type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicType {
    Void,
    Int,
    Float,
    Str,
    Boolean,
    Ptr,
    Struct,
    /// Pointer to a cdecl function defined in this program.
    CdeclFn,
    /// Pointer to a stdcall function defined in this program.
    StdcallFn,
    /// Pointer to a cdecl function imported from a dynamic library.
    CdeclExternFn,
    /// Pointer to a stdcall function imported from a dynamic library.
    StdcallExternFn,
}

impl IntrinsicType {
    /// The function-pointer variant for a convention/origin pair.
    pub fn function_variant(conv: CallConv, origin: FnOrigin) -> Self {
        match (conv, origin) {
            (CallConv::Cdecl, FnOrigin::Internal) => IntrinsicType::CdeclFn,
            (CallConv::Stdcall, FnOrigin::Internal) => IntrinsicType::StdcallFn,
            (CallConv::Cdecl, FnOrigin::External) => IntrinsicType::CdeclExternFn,
            (CallConv::Stdcall, FnOrigin::External) => IntrinsicType::StdcallExternFn,
        }
    }

    /// Whether this tag is one of the four function-pointer variants.
    pub fn is_function(&self) -> bool {
        self.call_conv().is_some()
    }

    /// The calling convention encoded in a function-pointer tag.
    pub fn call_conv(&self) -> Option<CallConv> {
        match self {
            IntrinsicType::CdeclFn | IntrinsicType::CdeclExternFn => Some(CallConv::Cdecl),
            IntrinsicType::StdcallFn | IntrinsicType::StdcallExternFn => Some(CallConv::Stdcall),
            _ => None,
        }
    }

    /// The origin encoded in a function-pointer tag.
    pub fn fn_origin(&self) -> Option<FnOrigin> {
        match self {
            IntrinsicType::CdeclFn | IntrinsicType::StdcallFn => Some(FnOrigin::Internal),
            IntrinsicType::CdeclExternFn | IntrinsicType::StdcallExternFn => {
                Some(FnOrigin::External)
            }
            _ => None,
        }
    }

    /// Whether the tag describes a composite type carrying a nested [`TypeInfo`].
    pub fn is_composite(&self) -> bool {
        matches!(self, IntrinsicType::Ptr | IntrinsicType::Struct) || self.is_function()
    }
}

/// A resolved type: an intrinsic tag plus the nested type for composite kinds.
///
/// Two values are equal iff their tags and nested types are recursively
/// equal, which the derived `PartialEq` provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub intrinsic: IntrinsicType,
    /// Return type for function pointers, pointee/field type for `Ptr`/`Struct`.
    pub target: Option<Box<TypeInfo>>,
}

impl TypeInfo {
    pub fn void() -> Self {
        Self::plain(IntrinsicType::Void)
    }

    pub fn int() -> Self {
        Self::plain(IntrinsicType::Int)
    }

    pub fn float() -> Self {
        Self::plain(IntrinsicType::Float)
    }

    pub fn string() -> Self {
        Self::plain(IntrinsicType::Str)
    }

    pub fn boolean() -> Self {
        Self::plain(IntrinsicType::Boolean)
    }

    /// A raw pointer, optionally typed.
    pub fn pointer(pointee: Option<TypeInfo>) -> Self {
        Self {
            intrinsic: IntrinsicType::Ptr,
            target: pointee.map(Box::new),
        }
    }

    /// A struct type, optionally carrying its field type.
    pub fn structure(field: Option<TypeInfo>) -> Self {
        Self {
            intrinsic: IntrinsicType::Struct,
            target: field.map(Box::new),
        }
    }

    /// A function-pointer type carrying its return type.
    pub fn function(conv: CallConv, origin: FnOrigin, return_type: TypeInfo) -> Self {
        Self {
            intrinsic: IntrinsicType::function_variant(conv, origin),
            target: Some(Box::new(return_type)),
        }
    }

    fn plain(intrinsic: IntrinsicType) -> Self {
        Self {
            intrinsic,
            target: None,
        }
    }

    /// The return type of a function-pointer type, if this is one.
    pub fn return_type(&self) -> Option<&TypeInfo> {
        if self.intrinsic.is_function() {
            self.target.as_deref()
        } else {
            None
        }
    }

    /// Size in bytes of a value of this type on the 32-bit target.
    ///
    /// Strings and structs are reference-shaped (the value is an address)
    /// except that a struct's storage size comes from its field type when
    /// one is present.
    pub fn byte_size(&self) -> u32 {
        match self.intrinsic {
            IntrinsicType::Void => 0,
            IntrinsicType::Float => 8,
            IntrinsicType::Struct => self.target.as_ref().map_or(4, |t| t.byte_size().max(4)),
            _ => 4,
        }
    }

    /// Size of the stack slot holding a value of this type, rounded up to
    /// the 4-byte stack granularity.
    pub fn stack_slot_size(&self) -> u32 {
        self.byte_size().div_ceil(4) * 4
    }
}
