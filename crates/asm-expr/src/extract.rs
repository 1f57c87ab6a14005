//! Shape queries on simplified expressions.
//!
//! Every query takes the tree by `&mut` because it may simplify first, and
//! the caller keeps the simplified tree whether or not the query succeeds.
//! [`Expr::extract_symbol`] is the exception: it only commits its rewrite
//! when it succeeds.

use tracing::trace;

use crate::expr::{Expr, ExprItem, Op};
use crate::layout::Layout;
use crate::num::{FloatNum, IntNum};
use crate::symbol::SymbolId;

impl Expr {
    /// Simplifies the tree and returns its value if it is a single integer.
    ///
    /// ```rust
    /// use asm_expr::{Expr, ExprItem, IntNum, Op};
    ///
    /// let mut e = Expr::binary(Op::Shl, IntNum::from(1), IntNum::from(12), 1).unwrap();
    /// assert_eq!(e.get_integer(None), Some(&IntNum::from(4096)));
    ///
    /// let mut r = Expr::binary(Op::Add, ExprItem::reg(0), IntNum::from(0), 1).unwrap();
    /// assert_eq!(r.get_integer(None), None);
    /// ```
    pub fn get_integer(&mut self, layout: Option<&dyn Layout>) -> Option<&IntNum> {
        self.simplify_in_place(layout);
        match (self.op(), self.first()) {
            (Op::Ident, ExprItem::Int(n)) => Some(n),
            _ => None,
        }
    }

    /// Simplifies the tree and returns its value if it is a single float.
    /// An integer result does not qualify.
    pub fn get_float(&mut self) -> Option<&FloatNum> {
        self.simplify_in_place(None);
        match (self.op(), self.first()) {
            (Op::Ident, ExprItem::Float(n)) => Some(n),
            _ => None,
        }
    }

    /// Returns the symbol if the tree is exactly `IDENT sym`, optionally
    /// after simplifying.
    pub fn get_symbol(&mut self, simplify: bool) -> Option<SymbolId> {
        if simplify {
            self.simplify_in_place(None);
        }
        match (self.op(), self.first()) {
            (Op::Ident, ExprItem::Sym(id)) => Some(*id),
            _ => None,
        }
    }

    /// Returns the register if the tree is exactly `IDENT reg`, optionally
    /// after simplifying.
    pub fn get_register(&mut self, simplify: bool) -> Option<u32> {
        if simplify {
            self.simplify_in_place(None);
        }
        match (self.op(), self.first()) {
            (Op::Ident, ExprItem::Reg(reg)) => Some(*reg),
            _ => None,
        }
    }

    /// Pulls the one symbol out of an additive expression, for relocation.
    ///
    /// The symbol must be the only symbol in the simplified tree and must sit
    /// in additive position: under `IDENT` and `ADD` nodes, or on the minuend
    /// side of a `SUB`. A label is replaced by its offset from its section
    /// start, so the remaining tree is the addend relative to that section;
    /// any other symbol is replaced by 0.
    ///
    /// Returns `None` and leaves the tree untouched if there is no such
    /// symbol, more than one, if it sits under any other operator, or if it
    /// is a label whose offset is not known yet.
    pub fn extract_symbol(&mut self, layout: Option<&dyn Layout>) -> Option<SymbolId> {
        let work = self.clone().simplify(layout);

        let mut found = None;
        if !additive_expr(&work, false, &mut found) {
            trace!(line = self.line(), "expression too complex for symbol extraction");
            return None;
        }
        let Some(sym) = found else {
            trace!(line = self.line(), "no symbol to extract");
            return None;
        };

        let value = match layout {
            Some(layout) if layout.is_label(sym) => match layout.label_offset(sym) {
                Some(offset) => offset,
                None => {
                    trace!(symbol = sym.raw(), "label offset not yet known");
                    return None;
                }
            },
            _ => IntNum::zero(),
        };

        let mut work = work;
        let mut value = Some(value);
        work.replace_symbol(sym, &mut value);
        *self = work.simplify(layout);
        Some(sym)
    }

    /// Replaces the first reference to `sym` by the literal in `value`.
    fn replace_symbol(&mut self, sym: SymbolId, value: &mut Option<IntNum>) {
        for item in self.operands_mut() {
            if value.is_none() {
                return;
            }
            if item.as_sym() == Some(sym) {
                if let Some(v) = value.take() {
                    *item = ExprItem::Int(v);
                }
            } else if let ExprItem::Expr(sub) = item {
                sub.replace_symbol(sym, value);
            }
        }
    }
}

/// Walks additive structure, recording the single symbol met in positive
/// position. Returns false as soon as extraction becomes unsafe.
fn additive_symbol(item: &ExprItem, negated: bool, found: &mut Option<SymbolId>) -> bool {
    match item {
        ExprItem::Sym(id) => {
            if negated || found.is_some() {
                return false;
            }
            *found = Some(*id);
            true
        }
        ExprItem::Expr(sub) => additive_expr(sub, negated, found),
        _ => true,
    }
}

fn additive_expr(expr: &Expr, negated: bool, found: &mut Option<SymbolId>) -> bool {
    match (expr.op(), expr.second()) {
        (Op::Ident, _) => additive_symbol(expr.first(), negated, found),
        (Op::Add, Some(right)) => {
            additive_symbol(expr.first(), negated, found) && additive_symbol(right, negated, found)
        }
        (Op::Sub, Some(right)) => {
            additive_symbol(expr.first(), negated, found) && additive_symbol(right, !negated, found)
        }
        _ => !expr.contains_symbol(),
    }
}
