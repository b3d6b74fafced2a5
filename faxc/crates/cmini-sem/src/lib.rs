//! Codegen-facing queries layered over `cmini_par::{Type, type_of}`.
//!
//! This crate depends on `cmini-par` one way only: the parser needs no
//! knowledge of anything here. What it adds is the handful of small
//! decisions the code generator has to make repeatedly (is this node an
//! l-value, how wide is this load/store, by how much does a pointer
//! addition scale) kept out of `cmini-gen` so that crate stays a pure
//! instruction emitter.

use cmini_par::{Expr, Type};
use cmini_util::{Span, Width};
use thiserror::Error;

pub use cmini_par::type_of;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SemError {
    #[error("unsupported load/store width")]
    UnsupportedWidth { span: Span },
}

/// `Some(elem.size())` when `ty` is `Ptr`/`Array`, used to scale one side of
/// a pointer `Add`/`Sub` before the underlying integer op, per §4.4.
pub fn pointer_scale(ty: &Type) -> Option<u32> {
    ty.elem().map(Type::size)
}

/// True for the two node shapes the grammar allows as an l-value.
pub fn is_lvalue(expr: &Expr) -> bool {
    cmini_par::ast::is_lvalue(expr)
}

/// Maps a type's size to the width `gen_load` knows how to emit.
pub fn load_width(ty: &Type, span: Span) -> Result<Width, SemError> {
    Width::from_size(ty.size()).ok_or(SemError::UnsupportedWidth { span })
}

/// Maps a type's size to the width `gen_store` knows how to emit.
pub fn store_width(ty: &Type, span: Span) -> Result<Width, SemError> {
    Width::from_size(ty.size()).ok_or(SemError::UnsupportedWidth { span })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_scale_is_elem_size() {
        let ty = Type::ptr(Type::Int);
        assert_eq!(pointer_scale(&ty), Some(4));
        assert_eq!(pointer_scale(&Type::Int), None);
    }

    #[test]
    fn array_type_has_no_load_width() {
        let ty = Type::array(Type::Int, 3);
        assert!(load_width(&ty, Span::at(0)).is_err());
    }

    #[test]
    fn char_width_is_one_byte() {
        assert_eq!(load_width(&Type::Char, Span::at(0)).unwrap(), Width::Byte);
    }
}
