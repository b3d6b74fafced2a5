//! The semantic type system (§4.3) and the pure `type_of` resolver.
//!
//! `Type` and `type_of` live in this crate, rather than in a downstream
//! semantic-analysis crate, because `sizeof e` must be replaced with an
//! integer literal equal to `type_of(e).size()` during parsing itself; the
//! parser cannot defer that to a later pass.

use crate::ast::{Expr, ExprKind};
use crate::error::ParseError;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Ptr(Rc<Type>),
    Array(Rc<Type>, u32),
}

impl Type {
    pub fn ptr(to: Type) -> Type {
        Type::Ptr(Rc::new(to))
    }

    pub fn array(elem: Type, count: u32) -> Type {
        Type::Array(Rc::new(elem), count)
    }

    /// Size in bytes, per §3: `Int` is 4, `Char` is 1, any pointer is 8, and
    /// an array is `count * elem.size()`.
    pub fn size(&self) -> u32 {
        match self {
            Type::Int => 4,
            Type::Char => 1,
            Type::Ptr(_) => 8,
            Type::Array(elem, count) => elem.size() * count,
        }
    }

    /// The type this one "points to" for `Ptr`/`Array`; `None` otherwise.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Ptr(t) | Type::Array(t, _) => Some(t),
            Type::Int | Type::Char => None,
        }
    }

    pub fn is_pointer_like(&self) -> bool {
        matches!(self, Type::Ptr(_) | Type::Array(_, _))
    }
}

/// Resolves the semantic type of an expression node, per the table in §4.3.
pub fn type_of(expr: &Expr) -> Result<Type, ParseError> {
    match &expr.kind {
        ExprKind::Num(_) => Ok(Type::Int),
        ExprKind::Eq(..)
        | ExprKind::Ne(..)
        | ExprKind::Lt(..)
        | ExprKind::Le(..)
        | ExprKind::Mul(..)
        | ExprKind::Div(..)
        | ExprKind::Assign(..)
        | ExprKind::Call(..) => Ok(Type::Int),
        ExprKind::VarRef(v) => Ok(v.ty.clone()),
        ExprKind::StringLit(_) => Ok(Type::ptr(Type::Char)),
        ExprKind::Addr(inner) => Ok(Type::ptr(type_of(inner)?)),
        ExprKind::Deref(inner) => {
            let inner_ty = type_of(inner)?;
            inner_ty
                .elem()
                .cloned()
                .ok_or(ParseError::InvalidDeref { span: expr.span })
        }
        ExprKind::Add(lhs, rhs) => {
            let lt = type_of(lhs)?;
            let rt = type_of(rhs)?;
            match (lt.is_pointer_like(), rt.is_pointer_like()) {
                (false, false) => Ok(Type::Int),
                (true, false) => Ok(lt),
                (false, true) => Ok(rt),
                (true, true) => Err(ParseError::InvalidPointerArithmetic { span: expr.span }),
            }
        }
        ExprKind::Sub(lhs, rhs) => {
            let lt = type_of(lhs)?;
            let rt = type_of(rhs)?;
            match (lt.is_pointer_like(), rt.is_pointer_like()) {
                (false, false) => Ok(Type::Int),
                (true, false) => Ok(lt),
                (true, true) => Ok(Type::Int),
                (false, true) => Err(ParseError::InvalidPointerArithmetic { span: expr.span }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_spec() {
        assert_eq!(Type::Int.size(), 4);
        assert_eq!(Type::Char.size(), 1);
        assert_eq!(Type::ptr(Type::Int).size(), 8);
        assert_eq!(Type::array(Type::Int, 3).size(), 12);
    }

    #[test]
    fn array_of_array_has_innermost_last_shape() {
        // `int x[2][3]` => Array(Array(Int, 3), 2)
        let ty = Type::array(Type::array(Type::Int, 3), 2);
        assert_eq!(ty.size(), 24);
        assert_eq!(ty.elem().unwrap().size(), 12);
    }
}
