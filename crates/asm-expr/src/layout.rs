//! Layout knowledge the leveler borrows from the surrounding assembler.
//!
//! The leveler never looks at sections or bytecodes directly. Everything it
//! needs to know about symbol positions and definitions comes through
//! [`Layout`]. A bare closure `Fn(SymbolId, SymbolId) -> Option<IntNum>`
//! implements the trait and supplies distances only.

use crate::expr::Expr;
use crate::num::IntNum;
use crate::symbol::SymbolId;

/// Symbol position and definition queries.
pub trait Layout {
    /// Signed offset `pos(minuend) - pos(subtrahend)`, if the relative
    /// placement of the two symbols is already fixed. `None` means "not yet":
    /// the pair is left in the tree for a later pass.
    fn distance(&self, minuend: SymbolId, subtrahend: SymbolId) -> Option<IntNum>;

    /// Whether `sym` is a label (as opposed to an EQU or external).
    fn is_label(&self, _sym: SymbolId) -> bool {
        false
    }

    /// Offset of a label from the start of its section, once known.
    fn label_offset(&self, _sym: SymbolId) -> Option<IntNum> {
        None
    }

    /// Value of an EQU symbol.
    fn equ(&self, _sym: SymbolId) -> Option<&Expr> {
        None
    }
}

impl<F> Layout for F
where
    F: Fn(SymbolId, SymbolId) -> Option<IntNum>,
{
    fn distance(&self, minuend: SymbolId, subtrahend: SymbolId) -> Option<IntNum> {
        self(minuend, subtrahend)
    }
}
